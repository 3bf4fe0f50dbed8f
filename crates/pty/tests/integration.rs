// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Integration tests for remoted-pty.
//!
//! These spawn real children on real ptys and verify end-to-end behavior.

use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use remoted_pty::{Pty, PtyCommand, Reap, ReadOutcome};
use tempfile::TempDir;

/// Read from the pty until `needle` shows up in the collected output.
fn read_until(pty: &Pty, needle: &str, timeout: Duration) -> String {
    let deadline = Instant::now() + timeout;
    let mut collected = Vec::new();
    let mut buf = [0_u8; 4096];
    loop {
        let text = String::from_utf8_lossy(&collected).into_owned();
        if text.contains(needle) {
            return text;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {needle:?}; got {text:?}"
        );
        match pty.read(&mut buf, Duration::from_millis(100)).unwrap() {
            ReadOutcome::Data(n) => collected.extend_from_slice(&buf[..n]),
            ReadOutcome::WouldBlock => {}
            ReadOutcome::Eof | ReadOutcome::Hangup => {
                let text = String::from_utf8_lossy(&collected).into_owned();
                assert!(text.contains(needle), "eof before {needle:?}; got {text:?}");
                return text;
            }
        }
    }
}

fn wait_exit(pty: &Pty, timeout: Duration) -> Reap {
    let deadline = Instant::now() + timeout;
    loop {
        match pty.reap().unwrap() {
            Reap::Alive => {
                assert!(Instant::now() < deadline, "child did not exit in time");
                std::thread::sleep(Duration::from_millis(10));
            }
            other => return other,
        }
    }
}

#[test]
fn cat_round_trips_input() {
    let pty = Pty::spawn(&PtyCommand::new("/bin/cat"), 24, 80).unwrap();
    assert_eq!(pty.write(b"hello\n").unwrap(), Some(6));
    read_until(&pty, "hello", Duration::from_secs(5));
    pty.kill(Signal::SIGKILL).unwrap();
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn child_runs_in_requested_cwd() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().file_name().unwrap().to_str().unwrap().to_owned();

    let mut cmd = PtyCommand::new("/bin/sh");
    cmd.args = vec!["-c".into(), "pwd".into()];
    cmd.cwd = Some(dir.path().to_path_buf());
    let pty = Pty::spawn(&cmd, 24, 80).unwrap();

    read_until(&pty, &marker, Duration::from_secs(5));
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn explicit_env_replaces_inherited_env() {
    let mut cmd = PtyCommand::new("/bin/sh");
    cmd.args = vec!["-c".into(), "echo marker=$REMOTED_TEST_VAR".into()];
    cmd.env = Some(vec![("REMOTED_TEST_VAR".into(), "pty-env".into())]);
    let pty = Pty::spawn(&cmd, 24, 80).unwrap();

    read_until(&pty, "marker=pty-env", Duration::from_secs(5));
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn child_sees_requested_window_size() {
    let mut cmd = PtyCommand::new("/bin/sh");
    cmd.args = vec!["-c".into(), "stty size".into()];
    let pty = Pty::spawn(&cmd, 31, 113).unwrap();

    read_until(&pty, "31 113", Duration::from_secs(5));
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn master_reports_hangup_or_eof_after_exit() {
    let mut cmd = PtyCommand::new("/bin/sh");
    cmd.args = vec!["-c".into(), "exit 0".into()];
    let pty = Pty::spawn(&cmd, 24, 80).unwrap();
    wait_exit(&pty, Duration::from_secs(5));

    let mut buf = [0_u8; 256];
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match pty.read(&mut buf, Duration::from_millis(100)).unwrap() {
            ReadOutcome::Eof | ReadOutcome::Hangup => break,
            ReadOutcome::Data(_) | ReadOutcome::WouldBlock => {
                assert!(Instant::now() < deadline, "no hangup after child exit");
            }
        }
    }
}
