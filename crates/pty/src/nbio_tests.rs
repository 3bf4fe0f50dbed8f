// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use nix::unistd::pipe;

#[test]
fn read_reports_would_block_on_empty_pipe() {
    let (rd, _wr) = pipe().unwrap();
    set_non_blocking(&rd).unwrap();

    let mut buf = [0_u8; 16];
    assert_eq!(read(&rd, &mut buf).unwrap(), ReadOutcome::WouldBlock);
}

#[test]
fn read_returns_written_data() {
    let (rd, wr) = pipe().unwrap();
    set_non_blocking(&rd).unwrap();

    assert_eq!(write(&wr, b"abc").unwrap(), Some(3));
    let mut buf = [0_u8; 16];
    assert_eq!(read(&rd, &mut buf).unwrap(), ReadOutcome::Data(3));
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn read_reports_eof_after_writer_closes() {
    let (rd, wr) = pipe().unwrap();
    set_non_blocking(&rd).unwrap();
    drop(wr);

    let mut buf = [0_u8; 16];
    assert_eq!(read(&rd, &mut buf).unwrap(), ReadOutcome::Eof);
}
