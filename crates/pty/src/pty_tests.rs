// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::time::Duration;

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
fn spawn_reports_pts_tty_name() {
    let pty = Pty::spawn(&PtyCommand::new("/bin/cat"), 24, 80).unwrap();
    assert!(pty.tty_name().starts_with("/dev/"), "{}", pty.tty_name());
    pty.kill(Signal::SIGKILL).unwrap();
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn exit_code_is_preserved() {
    let mut cmd = PtyCommand::new("/bin/sh");
    cmd.args = vec!["-c".into(), "exit 7".into()];
    let pty = Pty::spawn(&cmd, 24, 80).unwrap();
    assert_eq!(wait_exit(&pty, Duration::from_secs(5)), Reap::Exited(7));
}

#[test]
fn signal_death_is_encoded_as_128_plus_signo() {
    let pty = Pty::spawn(&PtyCommand::new("/bin/cat"), 24, 80).unwrap();
    pty.kill(Signal::SIGKILL).unwrap();
    assert_eq!(wait_exit(&pty, Duration::from_secs(5)), Reap::Exited(137));
}

#[test]
fn exec_failure_exits_127() {
    let pty = Pty::spawn(&PtyCommand::new("/no/such/binary"), 24, 80).unwrap();
    assert_eq!(wait_exit(&pty, Duration::from_secs(5)), Reap::Exited(127));
}

#[test]
fn read_times_out_when_child_is_silent() {
    let pty = Pty::spawn(&PtyCommand::new("/bin/cat"), 24, 80).unwrap();
    let mut buf = [0_u8; 64];
    let outcome = pty.read(&mut buf, Duration::from_millis(50)).unwrap();
    assert_eq!(outcome, ReadOutcome::WouldBlock);
    pty.kill(Signal::SIGKILL).unwrap();
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn resize_succeeds_on_live_master() {
    let pty = Pty::spawn(&PtyCommand::new("/bin/cat"), 24, 80).unwrap();
    pty.resize(50, 132).unwrap();
    pty.kill(Signal::SIGKILL).unwrap();
    wait_exit(&pty, Duration::from_secs(5));
}

#[test]
fn nul_byte_in_argument_is_rejected() {
    let mut cmd = PtyCommand::new("/bin/echo");
    cmd.args = vec!["a\0b".into()];
    assert!(matches!(
        Pty::spawn(&cmd, 24, 80),
        Err(PtyError::NulByte)
    ));
}
