// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Async process registry: backgrounded children on pipes.
//!
//! Each record owns the child plus its three pipe endpoints. The registry
//! table is behind one mutex; handlers snapshot the record out of the lock
//! and do their I/O against the record's own per-stream mutexes, so the
//! table lock is never held across host I/O. Operations on a single handle
//! serialize on those stream mutexes.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as TokioMutex;

use crate::encoding::{decode_base64, smart_encode};
use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;

use super::{encode_exit_status, resolve_env, resolve_signal, SignalSpec, SpawnParams};

const PIPE_HANDLE_START: u32 = 1;
const PIPE_HANDLE_LIMIT: u32 = 10_000;
const DEFAULT_MAX_BYTES: usize = 65_536;
const READ_CHUNK: usize = 8_192;

fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

/// A backgrounded pipe child.
struct PipeChild {
    os_pid: i32,
    cmd: String,
    child: TokioMutex<Child>,
    stdin: TokioMutex<Option<ChildStdin>>,
    stdout: TokioMutex<Option<ChildStdout>>,
    stderr: TokioMutex<Option<ChildStderr>>,
    /// Frozen on first observation of exit.
    exit_code: Mutex<Option<i32>>,
}

impl PipeChild {
    /// Observe the child's exit status without blocking; the first
    /// observation freezes the code.
    async fn refresh_exit(&self) -> Option<i32> {
        if let Some(code) = *self.exit_code.lock() {
            return Some(code);
        }
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => {
                let code = encode_exit_status(status);
                *self.exit_code.lock() = Some(code);
                Some(code)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(os_pid = self.os_pid, error = %e, "try_wait failed");
                None
            }
        }
    }
}

struct RegistryInner {
    table: HashMap<u32, Arc<PipeChild>>,
    next_handle: u32,
}

/// Registry of pipe-based children, keyed by handles in `[1, 10000)`.
pub struct ProcessRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                table: HashMap::new(),
                next_handle: PIPE_HANDLE_START,
            }),
        }
    }

    fn get(&self, pid: u32) -> Result<Arc<PipeChild>, RpcFailure> {
        self.inner
            .lock()
            .table
            .get(&pid)
            .cloned()
            .ok_or_else(|| RpcFailure::process(format!("no such process handle: {pid}")))
    }

    /// `process.start` — spawn a child with stdin/stdout/stderr piped.
    pub async fn start(&self, p: Value) -> Result<Value, RpcFailure> {
        let p: SpawnParams = params(p)?;

        let mut command = Command::new(&p.cmd);
        command
            .args(&p.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &p.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = resolve_env(p.env.clone(), p.clear_env) {
            command.env_clear();
            command.envs(env);
        }

        let mut child = command
            .spawn()
            .map_err(|e| RpcFailure::from_io(&e, &p.cmd))?;
        let os_pid = child.id().map_or(-1, |pid| pid as i32);

        let record = Arc::new(PipeChild {
            os_pid,
            cmd: p.display_command(),
            stdin: TokioMutex::new(child.stdin.take()),
            stdout: TokioMutex::new(child.stdout.take()),
            stderr: TokioMutex::new(child.stderr.take()),
            child: TokioMutex::new(child),
            exit_code: Mutex::new(None),
        });

        let handle = {
            let mut inner = self.inner.lock();
            if inner.next_handle >= PIPE_HANDLE_LIMIT {
                return Err(RpcFailure::process("process handle space exhausted"));
            }
            let handle = inner.next_handle;
            inner.next_handle += 1;
            inner.table.insert(handle, record);
            handle
        };

        tracing::debug!(handle, os_pid, cmd = %p.cmd, "started pipe child");
        Ok(json!({ "pid": handle }))
    }

    /// `process.write` — append to the child's stdin and flush.
    pub async fn write(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(serde::Deserialize)]
        struct WriteParams {
            pid: u32,
            data: String,
        }

        let p: WriteParams = params(p)?;
        let record = self.get(p.pid)?;
        let bytes = decode_base64(&p.data)
            .map_err(|e| RpcFailure::invalid_params(format!("invalid base64 data: {e}")))?;

        let mut slot = record.stdin.lock().await;
        let stdin = slot
            .as_mut()
            .ok_or_else(|| RpcFailure::process(format!("stdin closed for process {}", p.pid)))?;
        let outcome = async {
            stdin.write_all(&bytes).await?;
            stdin.flush().await
        }
        .await;
        outcome
            .map_err(|e| RpcFailure::process(format!("write to process {} failed: {e}", p.pid)))?;

        Ok(json!({ "written": bytes.len() }))
    }

    /// `process.read` — budgeted drain of stdout and stderr, plus the
    /// child's exit status.
    pub async fn read(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(serde::Deserialize)]
        struct ReadParams {
            pid: u32,
            #[serde(default = "default_max_bytes")]
            max_bytes: usize,
            #[serde(default)]
            timeout_ms: u64,
        }

        let p: ReadParams = params(p)?;
        let record = self.get(p.pid)?;
        // A zero timeout still yields for a minimal budget instead of
        // blocking or busy-spinning.
        let budget = Duration::from_millis(p.timeout_ms.max(1));

        let (stdout, stderr) = tokio::join!(
            drain_stream(&record.stdout, p.max_bytes, budget),
            drain_stream(&record.stderr, p.max_bytes, budget),
        );
        let exit_code = record.refresh_exit().await;

        let (stdout, stdout_encoding) = stream_fields(stdout);
        let (stderr, stderr_encoding) = stream_fields(stderr);
        Ok(json!({
            "exited": exit_code.is_some(),
            "exit_code": exit_code,
            "stdout": stdout,
            "stdout_encoding": stdout_encoding,
            "stderr": stderr,
            "stderr_encoding": stderr_encoding,
        }))
    }

    /// `process.close_stdin` — close the child's stdin durably.
    pub async fn close_stdin(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(serde::Deserialize)]
        struct CloseStdinParams {
            pid: u32,
        }

        let p: CloseStdinParams = params(p)?;
        let record = self.get(p.pid)?;
        let mut slot = record.stdin.lock().await;
        if let Some(mut stdin) = slot.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| RpcFailure::process(format!("close stdin failed: {e}")))?;
        }
        Ok(json!({}))
    }

    /// `process.kill` — deliver a signal. SIGKILL also evicts the record
    /// (in the same critical section); any other signal leaves it so the
    /// exit status stays observable.
    pub async fn kill(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(serde::Deserialize)]
        struct KillParams {
            pid: u32,
            #[serde(default)]
            signal: Option<SignalSpec>,
        }

        let p: KillParams = params(p)?;
        let sig = resolve_signal(p.signal.as_ref())?;

        if sig == Signal::SIGKILL {
            let mut inner = self.inner.lock();
            let record = inner
                .table
                .remove(&p.pid)
                .ok_or_else(|| RpcFailure::process(format!("no such process handle: {}", p.pid)))?;
            let _ = signal::kill(Pid::from_raw(record.os_pid), sig);
            tracing::debug!(handle = p.pid, os_pid = record.os_pid, "killed and evicted");
        } else {
            let record = self.get(p.pid)?;
            signal::kill(Pid::from_raw(record.os_pid), sig)
                .map_err(|e| RpcFailure::process(format!("kill failed: {e}")))?;
        }
        Ok(json!({}))
    }

    /// `process.list` — snapshot of live handles with refreshed status.
    pub async fn list(&self) -> Result<Value, RpcFailure> {
        let mut records: Vec<(u32, Arc<PipeChild>)> = {
            let inner = self.inner.lock();
            inner
                .table
                .iter()
                .map(|(handle, record)| (*handle, Arc::clone(record)))
                .collect()
        };
        records.sort_by_key(|(handle, _)| *handle);

        let mut processes = Vec::with_capacity(records.len());
        for (handle, record) in records {
            let exit_code = record.refresh_exit().await;
            processes.push(json!({
                "pid": handle,
                "os_pid": record.os_pid,
                "cmd": record.cmd,
                "exited": exit_code.is_some(),
                "exit_code": exit_code,
            }));
        }
        Ok(json!({ "processes": processes }))
    }
}

/// Drain up to `max` bytes from a piped stream within `budget`.
///
/// The first read may wait out the whole budget; once bytes have arrived,
/// follow-up reads only pick up what is immediately available so a chatty
/// child cannot pin the call past its window.
async fn drain_stream<R>(
    slot: &TokioMutex<Option<R>>,
    max: usize,
    budget: Duration,
) -> Option<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut guard = slot.lock().await;
    let stream = guard.as_mut()?;

    let deadline = tokio::time::Instant::now() + budget;
    let mut collected = Vec::new();
    let mut buf = [0_u8; READ_CHUNK];
    loop {
        if collected.len() >= max {
            break;
        }
        let window = if collected.is_empty() {
            deadline
        } else {
            tokio::time::Instant::now() + Duration::from_millis(1)
        };
        let space = buf.len().min(max - collected.len());
        match tokio::time::timeout_at(window, stream.read(&mut buf[..space])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => collected.extend_from_slice(&buf[..n]),
            Ok(Err(_)) | Err(_) => break,
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected)
    }
}

/// Wire fields for one drained stream: payload and encoding, both null
/// when nothing was read in the window.
fn stream_fields(bytes: Option<Vec<u8>>) -> (Value, Value) {
    match bytes {
        Some(bytes) => {
            let (payload, encoding) = smart_encode(&bytes);
            (
                json!(payload),
                serde_json::to_value(encoding).unwrap_or(Value::Null),
            )
        }
        None => (Value::Null, Value::Null),
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
