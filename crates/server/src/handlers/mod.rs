// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Leaf method handlers: file metadata and I/O, directories, system info.
//!
//! Handlers take the raw `params` value, decode it into a typed struct, and
//! run their host calls on the blocking pool so the dispatch task stays
//! responsive while a request is in flight.

pub mod attrs;
pub mod dir;
pub mod file;
pub mod system;

use serde::Serialize;
use serde_json::Value;

use crate::rpc::error::RpcFailure;

/// Run blocking host work off the dispatch task.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, RpcFailure>
where
    F: FnOnce() -> Result<T, RpcFailure> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RpcFailure::Internal(e.to_string()))?
}

/// Serialize a handler result into the response `result` value.
pub(crate) fn to_value<T: Serialize>(value: T) -> Result<Value, RpcFailure> {
    serde_json::to_value(value).map_err(|e| RpcFailure::Internal(e.to_string()))
}
