// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking I/O helpers for the pty master fd.

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use std::os::fd::{AsFd, AsRawFd};

/// Outcome of a non-blocking read from a pty master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were read into the buffer.
    Data(usize),
    /// Nothing buffered; the fd is still open.
    WouldBlock,
    /// read(2) returned 0.
    Eof,
    /// EIO from the master. On Linux this is how a pty reports that the
    /// slave side has been closed; the child has likely exited.
    Hangup,
}

pub fn set_non_blocking<F: AsRawFd>(fd: &F) -> nix::Result<()> {
    let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

/// Read without blocking. EAGAIN and EIO are not errors here; they are
/// states the caller must distinguish (see [`ReadOutcome`]).
pub fn read<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> nix::Result<ReadOutcome> {
    match nix::unistd::read(fd.as_raw_fd(), buf) {
        Ok(0) => Ok(ReadOutcome::Eof),
        Ok(n) => Ok(ReadOutcome::Data(n)),
        Err(Errno::EAGAIN) => Ok(ReadOutcome::WouldBlock),
        Err(Errno::EIO) => Ok(ReadOutcome::Hangup),
        Err(e) => Err(e),
    }
}

/// Write without blocking. Returns `None` if the write would block; a pty
/// master may also accept fewer bytes than offered (short write).
pub fn write<F: AsFd>(fd: &F, buf: &[u8]) -> nix::Result<Option<usize>> {
    match nix::unistd::write(fd, buf) {
        Ok(n) => Ok(Some(n)),
        Err(Errno::EAGAIN) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "nbio_tests.rs"]
mod tests;
