// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `process.run` — one-shot command execution.
//!
//! Spawns with pipes, feeds optional stdin, drains both output streams to
//! EOF, and waits. Unlike the registry paths this is synchronous from the
//! client's point of view: one request, one complete result.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;

use crate::encoding::{decode_base64, smart_encode};
use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;

use super::{encode_exit_status, resolve_env, SpawnParams};

#[derive(Debug, Deserialize)]
struct RunParams {
    #[serde(flatten)]
    spawn: SpawnParams,
    #[serde(default)]
    stdin: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

pub async fn run(p: Value) -> Result<Value, RpcFailure> {
    let p: RunParams = params(p)?;
    let stdin_bytes = p
        .stdin
        .as_deref()
        .map(decode_base64)
        .transpose()
        .map_err(|e| RpcFailure::invalid_params(format!("invalid base64 stdin: {e}")))?;

    let mut command = Command::new(&p.spawn.cmd);
    command
        .args(&p.spawn.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &p.spawn.cwd {
        command.current_dir(cwd);
    }
    if let Some(env) = resolve_env(p.spawn.env.clone(), p.spawn.clear_env) {
        command.env_clear();
        command.envs(env);
    }

    let mut child = command
        .spawn()
        .map_err(|e| RpcFailure::from_io(&e, &p.spawn.cmd))?;

    // Stdin feeding and output drains run as their own tasks so a child
    // that fills one pipe while we service another cannot deadlock us.
    if let Some(mut stdin) = child.stdin.take() {
        tokio::spawn(async move {
            if let Some(bytes) = stdin_bytes {
                let _ = stdin.write_all(&bytes).await;
            }
        });
    }
    let stdout_task = child.stdout.take().map(|mut stream| {
        tokio::spawn(async move {
            let mut collected = Vec::new();
            let _ = stream.read_to_end(&mut collected).await;
            collected
        })
    });
    let stderr_task = child.stderr.take().map(|mut stream| {
        tokio::spawn(async move {
            let mut collected = Vec::new();
            let _ = stream.read_to_end(&mut collected).await;
            collected
        })
    });

    let status = match p.timeout_ms {
        Some(ms) => match timeout(Duration::from_millis(ms), child.wait()).await {
            Ok(waited) => {
                waited.map_err(|e| RpcFailure::process(format!("wait failed: {e}")))?
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(RpcFailure::process(format!(
                    "process timed out after {ms} ms"
                )));
            }
        },
        None => child
            .wait()
            .await
            .map_err(|e| RpcFailure::process(format!("wait failed: {e}")))?,
    };

    let stdout_bytes = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };
    let stderr_bytes = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let (stdout, stdout_encoding) = smart_encode(&stdout_bytes);
    let (stderr, stderr_encoding) = smart_encode(&stderr_bytes);
    Ok(json!({
        "exit_code": encode_exit_status(status),
        "stdout": stdout,
        "stdout_encoding": stdout_encoding,
        "stderr": stderr,
        "stderr_encoding": stderr_encoding,
    }))
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
