// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! PTY registry: backgrounded children on pseudo-terminals.
//!
//! Records own the non-blocking master fd and the child pid. Exit status
//! is discovered by WNOHANG reap after each read or list; once observed it
//! never changes. EIO on the master is read as "the slave side is gone" —
//! a strong hint the child exited — and resolved by the same reap; ECHILD
//! during reap means someone else already collected the child, which is
//! terminal but leaves the exit code unknowable (null on the wire).

use std::collections::HashMap;
use std::os::fd::OwnedFd;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use remoted_pty::{foreground_group, nbio, Pty, PtyCommand, Reap, ReadOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex as TokioMutex;

use crate::encoding::{decode_base64, smart_encode};
use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;

use super::{resolve_env, resolve_signal, SignalSpec, SpawnParams};

const PTY_HANDLE_START: u32 = 10_000;
const DEFAULT_MAX_BYTES: usize = 65_536;
const READ_CHUNK: usize = 8_192;
const DEFAULT_ROWS: u16 = 24;
const DEFAULT_COLS: u16 = 80;

fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

fn default_rows() -> u16 {
    DEFAULT_ROWS
}

fn default_cols() -> u16 {
    DEFAULT_COLS
}

/// Cached termination state; frozen once `exited` is set, except that a
/// late concrete code may fill in a still-null one.
#[derive(Debug, Clone, Copy, Default)]
struct ExitState {
    exited: bool,
    code: Option<i32>,
}

/// A backgrounded pty child.
struct PtyChild {
    os_pid: Pid,
    cmd: String,
    tty_name: String,
    /// Taken exactly once, on SIGKILL or close; the fd itself closes when
    /// the last in-flight snapshot drops.
    master: Mutex<Option<Arc<OwnedFd>>>,
    /// Serializes master-side I/O per handle.
    io_lock: TokioMutex<()>,
    exit: Mutex<ExitState>,
}

struct RegistryInner {
    table: HashMap<u32, Arc<PtyChild>>,
    next_handle: u32,
}

/// Registry of pty-based children, keyed by handles `>= 10000`.
pub struct PtyRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for PtyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PtyRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                table: HashMap::new(),
                next_handle: PTY_HANDLE_START,
            }),
        }
    }

    fn lookup(&self, pid: u32) -> Option<Arc<PtyChild>> {
        self.inner.lock().table.get(&pid).cloned()
    }

    fn get(&self, pid: u32) -> Result<Arc<PtyChild>, RpcFailure> {
        self.lookup(pid)
            .ok_or_else(|| RpcFailure::process(format!("no such process handle: {pid}")))
    }

    /// `process.start_pty` — spawn a child on a fresh pty.
    pub async fn start(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct StartPtyParams {
            #[serde(flatten)]
            spawn: SpawnParams,
            #[serde(default = "default_rows")]
            rows: u16,
            #[serde(default = "default_cols")]
            cols: u16,
        }

        let p: StartPtyParams = params(p)?;
        let command = PtyCommand {
            program: p.spawn.cmd.clone(),
            args: p.spawn.args.clone(),
            cwd: p.spawn.cwd.clone(),
            env: resolve_env(p.spawn.env.clone(), p.spawn.clear_env),
        };
        let (rows, cols) = (p.rows, p.cols);

        let pty = tokio::task::spawn_blocking(move || Pty::spawn(&command, rows, cols))
            .await
            .map_err(|e| RpcFailure::internal(e.to_string()))?
            .map_err(|e| RpcFailure::process(e.to_string()))?;
        let (master, child, tty_name) = pty.into_parts();
        let os_pid = child.as_raw();

        let record = Arc::new(PtyChild {
            os_pid: child,
            cmd: p.spawn.display_command(),
            tty_name: tty_name.clone(),
            master: Mutex::new(Some(Arc::new(master))),
            io_lock: TokioMutex::new(()),
            exit: Mutex::new(ExitState::default()),
        });

        let handle = {
            let mut inner = self.inner.lock();
            let handle = inner.next_handle;
            inner.next_handle += 1;
            inner.table.insert(handle, record);
            handle
        };

        tracing::debug!(handle, os_pid, tty = %tty_name, cmd = %p.spawn.cmd, "started pty child");
        Ok(json!({ "pid": handle, "os_pid": os_pid, "tty_name": tty_name }))
    }

    /// `process.read_pty` — budgeted non-blocking read from the master.
    ///
    /// An unknown handle is not an error here: a client polling a closed
    /// handle gets a terminal `{exited: true, exit_code: null}` shape.
    pub async fn read(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct ReadPtyParams {
            pid: u32,
            #[serde(default = "default_max_bytes")]
            max_bytes: usize,
            #[serde(default)]
            timeout_ms: u64,
        }

        let p: ReadPtyParams = params(p)?;
        let Some(record) = self.lookup(p.pid) else {
            return Ok(json!({
                "output": Value::Null,
                "output_encoding": Value::Null,
                "exited": true,
                "exit_code": Value::Null,
            }));
        };

        let _io = record.io_lock.lock().await;
        let master = record.master.lock().clone();

        let mut output = None;
        if let Some(fd) = master {
            let budget = Duration::from_millis(p.timeout_ms.max(1));
            let max_bytes = p.max_bytes;
            output =
                tokio::task::spawn_blocking(move || drain_master(&fd, max_bytes, budget))
                    .await
                    .map_err(|e| RpcFailure::internal(e.to_string()))??;
        }

        let state = reap_record(&record).await?;
        let (output, output_encoding) = match output {
            Some(bytes) => {
                let (payload, encoding) = smart_encode(&bytes);
                (
                    json!(payload),
                    serde_json::to_value(encoding).unwrap_or(Value::Null),
                )
            }
            None => (Value::Null, Value::Null),
        };
        Ok(json!({
            "output": output,
            "output_encoding": output_encoding,
            "exited": state.exited,
            "exit_code": state.code,
        }))
    }

    /// `process.write_pty` — write to the master; may be short.
    pub async fn write(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct WritePtyParams {
            pid: u32,
            data: String,
        }

        let p: WritePtyParams = params(p)?;
        let record = self.get(p.pid)?;
        let bytes = decode_base64(&p.data)
            .map_err(|e| RpcFailure::invalid_params(format!("invalid base64 data: {e}")))?;

        let _io = record.io_lock.lock().await;
        let fd = record
            .master
            .lock()
            .clone()
            .ok_or_else(|| RpcFailure::process(format!("master closed for process {}", p.pid)))?;

        let written = tokio::task::spawn_blocking(move || match nbio::write(&fd, &bytes) {
            Ok(Some(n)) => Ok(n),
            Ok(None) => Ok(0),
            Err(e) => Err(RpcFailure::process(format!("pty write failed: {e}"))),
        })
        .await
        .map_err(|e| RpcFailure::internal(e.to_string()))??;

        Ok(json!({ "written": written }))
    }

    /// `process.resize_pty` — set the winsize, then best-effort SIGWINCH
    /// to the terminal's foreground process group (the child's own group
    /// as fallback). Signaling failures are silent; the resize stands.
    pub async fn resize(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct ResizePtyParams {
            pid: u32,
            rows: u16,
            cols: u16,
        }

        let p: ResizePtyParams = params(p)?;
        let record = self.get(p.pid)?;
        let fd = record
            .master
            .lock()
            .clone()
            .ok_or_else(|| RpcFailure::process(format!("master closed for process {}", p.pid)))?;
        let child_pid = record.os_pid;

        tokio::task::spawn_blocking(move || {
            remoted_pty::resize(&fd, p.rows, p.cols)
                .map_err(|e| RpcFailure::process(e.to_string()))?;
            let signaled = match foreground_group(&fd) {
                Ok(pgrp) => killpg(pgrp, Signal::SIGWINCH).is_ok(),
                Err(_) => false,
            };
            if !signaled {
                let _ = killpg(child_pid, Signal::SIGWINCH);
            }
            Ok(json!({}))
        })
        .await
        .map_err(|e| RpcFailure::internal(e.to_string()))?
    }

    /// `process.kill_pty` — deliver a signal. SIGKILL also evicts the
    /// record and releases the master fd.
    pub async fn kill(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct KillPtyParams {
            pid: u32,
            #[serde(default)]
            signal: Option<SignalSpec>,
        }

        let p: KillPtyParams = params(p)?;
        let sig = resolve_signal(p.signal.as_ref())?;

        if sig == Signal::SIGKILL {
            let record = self.remove(p.pid)?;
            let _ = signal::kill(record.os_pid, Signal::SIGKILL);
            drop(record.master.lock().take());
            tracing::debug!(handle = p.pid, "killed and evicted pty child");
        } else {
            let record = self.get(p.pid)?;
            signal::kill(record.os_pid, sig)
                .map_err(|e| RpcFailure::process(format!("kill failed: {e}")))?;
        }
        Ok(json!({}))
    }

    /// `process.close_pty` — unconditional teardown: evict, SIGKILL
    /// (ESRCH ignored), release the master fd.
    pub async fn close(&self, p: Value) -> Result<Value, RpcFailure> {
        #[derive(Debug, Deserialize)]
        struct ClosePtyParams {
            pid: u32,
        }

        let p: ClosePtyParams = params(p)?;
        let record = self.remove(p.pid)?;
        let _ = signal::kill(record.os_pid, Signal::SIGKILL);
        drop(record.master.lock().take());
        tracing::debug!(handle = p.pid, "closed pty child");
        Ok(json!({}))
    }

    /// `process.list_pty` — snapshot with the same reap-on-probe
    /// semantics as `read`.
    pub async fn list(&self) -> Result<Value, RpcFailure> {
        let mut records: Vec<(u32, Arc<PtyChild>)> = {
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
            let state = reap_record(&record).await?;
            processes.push(json!({
                "pid": handle,
                "os_pid": record.os_pid.as_raw(),
                "cmd": record.cmd,
                "tty_name": record.tty_name,
                "exited": state.exited,
                "exit_code": state.code,
            }));
        }
        Ok(json!({ "processes": processes }))
    }

    fn remove(&self, pid: u32) -> Result<Arc<PtyChild>, RpcFailure> {
        self.inner
            .lock()
            .table
            .remove(&pid)
            .ok_or_else(|| RpcFailure::process(format!("no such process handle: {pid}")))
    }
}

/// Wait for readability within `budget`, then drain what is immediately
/// available, up to `max` bytes. EOF and EIO both end the drain; the reap
/// that follows decides what they meant.
fn drain_master(
    fd: &OwnedFd,
    max: usize,
    budget: Duration,
) -> Result<Option<Vec<u8>>, RpcFailure> {
    let ready = remoted_pty::wait_readable(fd, budget)
        .map_err(|e| RpcFailure::process(e.to_string()))?;
    if !ready {
        return Ok(None);
    }

    let mut collected = Vec::new();
    let mut buf = [0_u8; READ_CHUNK];
    loop {
        if collected.len() >= max {
            break;
        }
        let space = buf.len().min(max - collected.len());
        match nbio::read(fd, &mut buf[..space])
            .map_err(|e| RpcFailure::process(format!("pty read failed: {e}")))?
        {
            ReadOutcome::Data(n) => collected.extend_from_slice(&buf[..n]),
            ReadOutcome::WouldBlock | ReadOutcome::Eof | ReadOutcome::Hangup => break,
        }
    }

    if collected.is_empty() {
        Ok(None)
    } else {
        Ok(Some(collected))
    }
}

/// WNOHANG reap with the result cached on the record.
async fn reap_record(record: &Arc<PtyChild>) -> Result<ExitState, RpcFailure> {
    {
        let state = *record.exit.lock();
        if state.exited && state.code.is_some() {
            return Ok(state);
        }
    }

    let child = record.os_pid;
    let reaped = tokio::task::spawn_blocking(move || remoted_pty::reap(child))
        .await
        .map_err(|e| RpcFailure::internal(e.to_string()))?;

    let mut state = record.exit.lock();
    match reaped {
        Ok(Reap::Alive) => {}
        Ok(Reap::Exited(code)) => {
            if !state.exited || state.code.is_none() {
                *state = ExitState {
                    exited: true,
                    code: Some(code),
                };
            }
        }
        Ok(Reap::Vanished) => {
            if !state.exited {
                *state = ExitState {
                    exited: true,
                    code: None,
                };
            }
        }
        Err(e) => {
            tracing::warn!(os_pid = child.as_raw(), error = %e, "pty reap failed");
        }
    }
    Ok(*state)
}

#[cfg(test)]
#[path = "pty_registry_tests.rs"]
mod tests;
