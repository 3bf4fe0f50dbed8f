// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state and the control-stream main loop.
//!
//! The loop is strictly sequential: one request line in, one response line
//! out, in arrival order. Handlers fan work out to the blocking pool and
//! to spawned tasks, but the loop itself never reads the next line before
//! the current response is written.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::signal::unix::{signal, SignalKind};

use crate::proc::pty_registry::PtyRegistry;
use crate::proc::registry::ProcessRegistry;
use crate::rpc::{codec, dispatch};

/// Process-wide server state: the two child registries.
///
/// Owned by value and shared through an `Arc` so tests can run fresh
/// servers side by side.
pub struct Server {
    procs: ProcessRegistry,
    ptys: PtyRegistry,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            procs: ProcessRegistry::new(),
            ptys: PtyRegistry::new(),
        }
    }

    /// Pipe-child registry.
    pub fn procs(&self) -> &ProcessRegistry {
        &self.procs
    }

    /// PTY-child registry.
    pub fn ptys(&self) -> &PtyRegistry {
        &self.ptys
    }

    /// Serve stdin/stdout until EOF, SIGINT, or a broken output stream.
    ///
    /// All three are clean shutdowns. Children in the registries are left
    /// running: a client may reconnect to them through a fresh server.
    pub async fn run(self: Arc<Self>) -> io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Main loop over arbitrary streams (tests drive this directly).
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut sigint = signal(SignalKind::interrupt())?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        tracing::debug!("control stream closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = dispatch::handle_line(&self, &line).await;
                    if let Err(err) = codec::write_line(&mut writer, &response).await {
                        if err.kind() == io::ErrorKind::BrokenPipe {
                            tracing::debug!("client went away");
                            break;
                        }
                        return Err(err);
                    }
                }
                _ = sigint.recv() => {
                    tracing::debug!("interrupted");
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
