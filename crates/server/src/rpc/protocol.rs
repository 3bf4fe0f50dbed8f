// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 response envelope types.
//!
//! The request side is validated field-by-field from a raw
//! `serde_json::Value` (see [`super::dispatch`]) because the id must be
//! echoed verbatim — including the distinction between an explicit `null`
//! and an absent id. Responses are typed: exactly one of `result`/`error`
//! is populated by construction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RpcFailure;

/// Protocol version string required in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 response.
///
/// An absent id serializes to no `id` field at all; `Some(Value::Null)`
/// serializes to `"id":null`.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: &'static str,
    /// Request id, echoed verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Result value on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Successful response carrying `result`.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response for a classified failure.
    pub fn failure(id: Option<Value>, failure: &RpcFailure) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(ErrorObject::from(failure)),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct ErrorObject {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&RpcFailure> for ErrorObject {
    fn from(failure: &RpcFailure) -> Self {
        Self {
            code: failure.code(),
            message: failure.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
