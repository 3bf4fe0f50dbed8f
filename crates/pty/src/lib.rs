// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pseudo-terminal process layer.
//!
//! Spawns child processes attached to a pty pair: the child sees the slave
//! side as its controlling terminal, the caller keeps the non-blocking master
//! side. Everything here is synchronous; callers that need async run these
//! operations on a blocking thread.

pub mod nbio;
mod pty;

pub use nbio::ReadOutcome;
pub use pty::{
    foreground_group, reap, resize, wait_readable, Pty, PtyCommand, PtyError, Reap,
};
