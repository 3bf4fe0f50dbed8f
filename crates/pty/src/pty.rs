// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! PTY (pseudo-terminal) handling.
//!
//! Creates a pty pair, forks, wires the slave up as the child's controlling
//! terminal, and execs the command. The parent keeps the non-blocking master
//! fd plus the child pid and can read, write, resize, signal, and reap.

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::pty::{openpty, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{chdir, close, dup2, execvp, execvpe, fork, setsid, ForkResult, Pid};

use crate::nbio::{self, ReadOutcome};

nix::ioctl_write_int_bad!(tiocsctty, libc::TIOCSCTTY);
nix::ioctl_write_ptr_bad!(tiocswinsz, libc::TIOCSWINSZ, Winsize);

/// Errors from pty setup and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// openpty(3) failed; no pty pair was allocated.
    #[error("openpty failed: {0}")]
    Open(#[source] Errno),

    /// fork(2) failed; the pty pair has been released.
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),

    /// Any other syscall failure, tagged with the call that failed.
    #[error("{0} failed: {1}")]
    Sys(&'static str, #[source] Errno),

    /// Command, argument, or environment entry contains an interior NUL.
    #[error("command contains an interior NUL byte")]
    NulByte,
}

/// Command description for a pty spawn.
#[derive(Debug, Clone)]
pub struct PtyCommand {
    /// Program to exec; resolved against `PATH` when not absolute.
    pub program: String,
    /// Arguments, not including the program itself.
    pub args: Vec<String>,
    /// Working directory for the child; inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Exact child environment; the parent's environment when `None`.
    pub env: Option<Vec<(String, String)>>,
}

impl PtyCommand {
    /// Command with no arguments, inherited cwd and environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }
}

/// A running child attached to a pty.
pub struct Pty {
    master: OwnedFd,
    child: Pid,
    tty_name: String,
}

impl Pty {
    /// Spawn `cmd` on a fresh pty with the given window size.
    ///
    /// The child starts a new session with the slave as its controlling
    /// terminal and the slave dup'ed onto fds 0..=2. If exec fails the child
    /// exits 127 via `_exit` so no inherited buffers are flushed twice.
    pub fn spawn(cmd: &PtyCommand, rows: u16, cols: u16) -> Result<Self, PtyError> {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let pair = openpty(Some(&winsize), None).map_err(PtyError::Open)?;
        let master = pair.master;
        let slave = pair.slave;
        let tty_name = tty_name_of(&slave)?;

        // Everything the child needs is prepared before fork: between fork
        // and exec only async-signal-safe calls are allowed.
        let program = CString::new(cmd.program.as_str()).map_err(|_| PtyError::NulByte)?;
        let mut argv = vec![program.clone()];
        for arg in &cmd.args {
            argv.push(CString::new(arg.as_str()).map_err(|_| PtyError::NulByte)?);
        }
        let envp = match &cmd.env {
            Some(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    entries.push(
                        CString::new(format!("{key}={value}")).map_err(|_| PtyError::NulByte)?,
                    );
                }
                Some(entries)
            }
            None => None,
        };
        let cwd = cmd.cwd.clone();

        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Parent { child } => {
                drop(slave);
                nbio::set_non_blocking(&master).map_err(|e| PtyError::Sys("fcntl", e))?;
                Ok(Self {
                    master,
                    child,
                    tty_name,
                })
            }
            ForkResult::Child => {
                // This branch never returns; raw fds only, so the OwnedFds
                // duplicated by fork are never double-closed.
                let slave_fd = slave.as_raw_fd();
                let _ = close(master.as_raw_fd());
                let _ = setsid();
                let _ = unsafe { tiocsctty(slave_fd, 0) };
                let _ = dup2(slave_fd, 0);
                let _ = dup2(slave_fd, 1);
                let _ = dup2(slave_fd, 2);
                if slave_fd > 2 {
                    let _ = close(slave_fd);
                }
                if let Some(dir) = cwd {
                    if chdir(&dir).is_err() {
                        unsafe { libc::_exit(127) };
                    }
                }
                let _ = match envp {
                    Some(env) => execvpe(&program, &argv, &env),
                    None => execvp(&program, &argv),
                };
                unsafe { libc::_exit(127) }
            }
        }
    }

    /// Master-side fd (non-blocking).
    pub fn master(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }

    /// Child pid.
    pub fn child(&self) -> Pid {
        self.child
    }

    /// Path of the slave terminal, e.g. `/dev/pts/3`.
    pub fn tty_name(&self) -> &str {
        &self.tty_name
    }

    /// Wait up to `timeout` for output, then read without blocking.
    pub fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome, PtyError> {
        if wait_readable(&self.master, timeout)? {
            nbio::read(&self.master, buf).map_err(|e| PtyError::Sys("read", e))
        } else {
            Ok(ReadOutcome::WouldBlock)
        }
    }

    /// Write to the master; may be a short write or `None` when full.
    pub fn write(&self, buf: &[u8]) -> Result<Option<usize>, PtyError> {
        nbio::write(&self.master, buf).map_err(|e| PtyError::Sys("write", e))
    }

    /// Set the window size and notify the terminal's foreground job.
    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), PtyError> {
        resize(&self.master, rows, cols)
    }

    /// Deliver `signal` to the child process.
    pub fn kill(&self, signal: Signal) -> Result<(), PtyError> {
        kill(self.child, signal).map_err(|e| PtyError::Sys("kill", e))
    }

    /// Non-blocking reap of the child.
    pub fn reap(&self) -> Result<Reap, PtyError> {
        reap(self.child)
    }

    /// Decompose into master fd, child pid, and tty name.
    pub fn into_parts(self) -> (OwnedFd, Pid, String) {
        (self.master, self.child, self.tty_name)
    }
}

/// Set the pty window size via TIOCSWINSZ on the master.
pub fn resize<F: AsFd>(fd: &F, rows: u16, cols: u16) -> Result<(), PtyError> {
    let winsize = Winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    unsafe { tiocswinsz(fd.as_fd().as_raw_fd(), &winsize) }
        .map_err(|e| PtyError::Sys("TIOCSWINSZ", e))?;
    Ok(())
}

/// Process group currently in the foreground of the terminal.
pub fn foreground_group<F: AsFd>(fd: &F) -> Result<Pid, PtyError> {
    let pgrp = unsafe { libc::tcgetpgrp(fd.as_fd().as_raw_fd()) };
    if pgrp < 0 {
        Err(PtyError::Sys("tcgetpgrp", Errno::last()))
    } else {
        Ok(Pid::from_raw(pgrp))
    }
}

/// Wait up to `timeout` for the fd to become readable.
///
/// Polls in bounded slices so arbitrarily large timeouts fit poll(2)'s
/// millisecond budget; EINTR restarts the wait.
pub fn wait_readable<F: AsFd>(fd: &F, timeout: Duration) -> Result<bool, PtyError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let slice_ms = remaining.as_millis().min(u128::from(u16::MAX)) as u16;
        let mut fds = [PollFd::new(fd.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(slice_ms)) {
            Ok(0) => {
                if Instant::now() >= deadline {
                    return Ok(false);
                }
            }
            Ok(_) => return Ok(true),
            Err(Errno::EINTR) => {}
            Err(e) => return Err(PtyError::Sys("poll", e)),
        }
    }
}

/// Result of a non-blocking reap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reap {
    /// Child still running.
    Alive,
    /// Child terminated: the exit code for a normal exit, `128 + signo` for
    /// signal death, `-1` for anything else waitpid reports as terminal.
    Exited(i32),
    /// ECHILD: the kernel no longer knows the child. Terminal, but the exit
    /// code is unrecoverable.
    Vanished,
}

/// WNOHANG waitpid on `child`, with the status encoded per [`Reap`].
pub fn reap(child: Pid) -> Result<Reap, PtyError> {
    match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => Ok(Reap::Alive),
        Ok(WaitStatus::Exited(_, code)) => Ok(Reap::Exited(code)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Ok(Reap::Exited(128 + signal as i32)),
        Ok(_) => Ok(Reap::Exited(-1)),
        Err(Errno::ECHILD) => Ok(Reap::Vanished),
        Err(e) => Err(PtyError::Sys("waitpid", e)),
    }
}

fn tty_name_of<F: AsRawFd>(fd: &F) -> Result<String, PtyError> {
    let mut buf = [0_u8; 128];
    let rc = unsafe { libc::ttyname_r(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return Err(PtyError::Sys("ttyname_r", Errno::from_raw(rc)));
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).map_err(|_| PtyError::Sys("ttyname_r", Errno::EINVAL))
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
