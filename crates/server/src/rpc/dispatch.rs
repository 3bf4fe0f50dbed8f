// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope validation, method dispatch, and the batch executor.
//!
//! One input line becomes exactly one [`Response`]. Validation happens in a
//! fixed order: parse, version, id extraction, method, table lookup. The id
//! is echoed verbatim; a request without an id still gets a response, just
//! with no `id` field.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers;
use crate::proc;
use crate::server::Server;

use super::error::RpcFailure;
use super::protocol::{ErrorObject, Response, JSONRPC_VERSION};

/// Decode a handler's params, mapping shape errors to INVALID_PARAMS.
pub(crate) fn params<T: DeserializeOwned>(value: Value) -> Result<T, RpcFailure> {
    serde_json::from_value(value).map_err(|e| RpcFailure::InvalidParams(format!("invalid params: {e}")))
}

/// Process one input line into a response.
pub async fn handle_line(server: &Arc<Server>, line: &str) -> Response {
    let envelope: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Response::failure(Some(Value::Null), &RpcFailure::Parse(e.to_string()));
        }
    };

    let id = envelope.get("id").cloned();

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Response::failure(
            id,
            &RpcFailure::InvalidRequest("missing or invalid jsonrpc version".into()),
        );
    }

    let method = envelope
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if method.is_empty() {
        return Response::failure(id, &RpcFailure::InvalidRequest("missing method".into()));
    }

    let request_params = envelope.get("params").cloned().unwrap_or_else(|| json!({}));

    match dispatch(server, method, request_params).await {
        Ok(result) => Response::success(id, result),
        Err(failure) => Response::failure(id, &failure),
    }
}

/// Route a method invocation to its handler.
pub async fn dispatch(
    server: &Arc<Server>,
    method: &str,
    request_params: Value,
) -> Result<Value, RpcFailure> {
    if method == "batch" {
        return run_batch(server, request_params).await;
    }
    dispatch_leaf(server, method, request_params).await
}

/// The dispatch table for every non-batch method.
async fn dispatch_leaf(
    server: &Arc<Server>,
    method: &str,
    p: Value,
) -> Result<Value, RpcFailure> {
    match method {
        "file.stat" => handlers::file::stat(p).await,
        "file.stat_batch" => handlers::file::stat_batch(p).await,
        "file.exists" => handlers::file::exists(p).await,
        "file.readable" => handlers::file::readable(p).await,
        "file.writable" => handlers::file::writable(p).await,
        "file.executable" => handlers::file::executable(p).await,
        "file.truename" => handlers::file::truename(p).await,
        "file.newer_than" => handlers::file::newer_than(p).await,
        "file.read" => handlers::file::read(p).await,
        "file.write" => handlers::file::write(p).await,
        "file.copy" => handlers::file::copy(p).await,
        "file.rename" => handlers::file::rename(p).await,
        "file.delete" => handlers::file::delete(p).await,
        "file.set_modes" => handlers::file::set_modes(p).await,
        "file.set_times" => handlers::file::set_times(p).await,
        "file.make_symlink" => handlers::file::make_symlink(p).await,
        "file.make_hardlink" => handlers::file::make_hardlink(p).await,
        "file.chown" => handlers::file::chown(p).await,

        "dir.list" => handlers::dir::list(p).await,
        "dir.create" => handlers::dir::create(p).await,
        "dir.remove" => handlers::dir::remove(p).await,
        "dir.completions" => handlers::dir::completions(p).await,

        "process.run" => proc::run::run(p).await,
        "process.start" => server.procs().start(p).await,
        "process.write" => server.procs().write(p).await,
        "process.read" => server.procs().read(p).await,
        "process.close_stdin" => server.procs().close_stdin(p).await,
        "process.kill" => server.procs().kill(p).await,
        "process.list" => server.procs().list().await,

        "process.start_pty" => server.ptys().start(p).await,
        "process.read_pty" => server.ptys().read(p).await,
        "process.write_pty" => server.ptys().write(p).await,
        "process.resize_pty" => server.ptys().resize(p).await,
        "process.kill_pty" => server.ptys().kill(p).await,
        "process.close_pty" => server.ptys().close(p).await,
        "process.list_pty" => server.ptys().list().await,

        "system.info" => handlers::system::info(p).await,
        "system.getenv" => handlers::system::getenv(p).await,
        "system.expand_path" => handlers::system::expand_path(p).await,
        "system.statvfs" => handlers::system::statvfs(p).await,
        "system.groups" => handlers::system::groups(p).await,

        other => Err(RpcFailure::MethodNotFound(other.to_owned())),
    }
}

#[derive(Debug, Deserialize)]
struct BatchParams {
    requests: Vec<BatchEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

/// Run every sub-request concurrently; `results[i]` answers `requests[i]`.
///
/// Sub-entries see only method lookup and handler errors (no envelope
/// validation), and may not themselves be `batch`.
async fn run_batch(server: &Arc<Server>, request_params: Value) -> Result<Value, RpcFailure> {
    let batch: BatchParams = params(request_params)?;

    let mut tasks = Vec::with_capacity(batch.requests.len());
    for entry in batch.requests {
        let server = Arc::clone(server);
        tasks.push(tokio::spawn(async move {
            let method = entry.method.unwrap_or_default();
            if method.is_empty() || method == "batch" {
                return Err(RpcFailure::MethodNotFound(method));
            }
            let sub_params = entry.params.unwrap_or_else(|| json!({}));
            dispatch_leaf(&server, &method, sub_params).await
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        let outcome = task
            .await
            .map_err(|e| RpcFailure::Internal(e.to_string()))?;
        results.push(match outcome {
            Ok(value) => json!({ "result": value }),
            Err(failure) => json!({ "error": ErrorObject::from(&failure) }),
        });
    }

    Ok(json!({ "results": results }))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
