// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unwrap/expect/panic ONLY in test code
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! remoted — remote operations server
//!
//! A long-lived JSON-RPC 2.0 server speaking newline-delimited JSON over
//! stdin/stdout. It exposes file-system, directory, system-info, and
//! process-control methods to a remote-editing client, replacing per-call
//! shell round-trips with one structured channel.
//!
//! Binary payloads are base64 on the wire; output bytes are returned as
//! UTF-8 text when they decode cleanly and base64 otherwise, with the
//! chosen encoding reported alongside. Backgrounded children live in two
//! registries (pipe-based and pty-based) keyed by server-assigned handles.

pub mod encoding;
pub mod handlers;
pub mod proc;
pub mod rpc;
pub mod server;
