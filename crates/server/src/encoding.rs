// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Smart byte encoding for wire payloads.
//!
//! Output bytes travel as UTF-8 text whenever they decode strictly, and as
//! base64 otherwise; the chosen encoding is reported in a sibling
//! `*_encoding` field. Client-supplied payloads are always base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

/// Wire encoding of a byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Payload is the bytes themselves, valid UTF-8.
    Text,
    /// Payload is base64 of the bytes.
    Base64,
}

/// Encode bytes for the wire, preferring inline text.
///
/// Total over byte strings: every input maps to a `(payload, encoding)`
/// pair that decodes back to the original bytes.
pub fn smart_encode(bytes: &[u8]) -> (String, Encoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_owned(), Encoding::Text),
        Err(_) => (STANDARD.encode(bytes), Encoding::Base64),
    }
}

/// Encode bytes as base64 (for fields that are always base64).
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 wire payload.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(payload)
}

#[cfg(test)]
#[path = "encoding_tests.rs"]
mod tests;
