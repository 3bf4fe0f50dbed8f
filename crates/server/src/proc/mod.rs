// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process management: one-shot runs plus the pipe and pty
//! registries.
//!
//! Registry handles are server-assigned, monotonically increasing, and
//! never reused: pipe children get handles in `[1, 10000)`, pty children
//! `>= 10000`, so a client can tell the two apart from the handle alone.

pub mod pty_registry;
pub mod registry;
pub mod run;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

use nix::sys::signal::Signal;
use serde::Deserialize;

use crate::rpc::error::RpcFailure;

/// Common spawn parameters shared by `process.run`, `process.start`, and
/// `process.start_pty`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnParams {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
    #[serde(default)]
    pub clear_env: bool,
}

impl SpawnParams {
    /// Command string cached for listings.
    pub fn display_command(&self) -> String {
        if self.args.is_empty() {
            self.cmd.clone()
        } else {
            format!("{} {}", self.cmd, self.args.join(" "))
        }
    }
}

/// Resolve the child environment. `None` means "inherit the server's
/// environment unchanged"; `Some` is the exact environment to use.
///
/// `clear_env` makes the provided vars (possibly none) the whole
/// environment; otherwise provided vars overlay the inherited ones.
pub(crate) fn resolve_env(
    env: Option<HashMap<String, String>>,
    clear_env: bool,
) -> Option<Vec<(String, String)>> {
    match (env, clear_env) {
        (None, false) => None,
        (None, true) => Some(Vec::new()),
        (Some(vars), true) => Some(vars.into_iter().collect()),
        (Some(vars), false) => {
            let mut merged: BTreeMap<String, String> = std::env::vars().collect();
            merged.extend(vars);
            Some(merged.into_iter().collect())
        }
    }
}

/// Signal selector: a number (`15`) or a name (`"SIGTERM"` / `"TERM"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignalSpec {
    Number(i32),
    Name(String),
}

impl SignalSpec {
    /// Resolve to a host signal, or INVALID_PARAMS.
    pub fn resolve(&self) -> Result<Signal, RpcFailure> {
        match self {
            Self::Number(number) => Signal::try_from(*number)
                .map_err(|_| RpcFailure::invalid_params(format!("unknown signal: {number}"))),
            Self::Name(name) => {
                let full = if name.starts_with("SIG") {
                    name.clone()
                } else {
                    format!("SIG{name}")
                };
                Signal::from_str(&full)
                    .map_err(|_| RpcFailure::invalid_params(format!("unknown signal: {name}")))
            }
        }
    }
}

/// Resolve an optional signal param, defaulting to SIGTERM.
pub(crate) fn resolve_signal(spec: Option<&SignalSpec>) -> Result<Signal, RpcFailure> {
    match spec {
        Some(spec) => spec.resolve(),
        None => Ok(Signal::SIGTERM),
    }
}

/// Encode a wait status: the exit code for a normal exit, `128 + signo`
/// for signal death, `-1` otherwise.
pub(crate) fn encode_exit_status(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signo| 128 + signo))
        .unwrap_or(-1)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
