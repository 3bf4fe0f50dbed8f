// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::encoding::encode_base64;
use std::time::Instant;

fn handle_of(started: &Value) -> u32 {
    started["pid"].as_u64().unwrap() as u32
}

async fn start_shell(registry: &PtyRegistry) -> u32 {
    let started = registry.start(json!({"cmd": "/bin/sh"})).await.unwrap();
    handle_of(&started)
}

/// Poll `process.read_pty` until the child is reported exited.
async fn read_until_exit(registry: &PtyRegistry, pid: u32) -> Value {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let out = registry
            .read(json!({"pid": pid, "timeout_ms": 200}))
            .await
            .unwrap();
        if out["exited"] == true {
            return out;
        }
        assert!(Instant::now() < deadline, "pty child never exited: {out}");
    }
}

#[tokio::test]
async fn start_reports_handle_os_pid_and_tty() {
    let registry = PtyRegistry::new();
    let started = registry.start(json!({"cmd": "/bin/sh"})).await.unwrap();
    assert!(started["pid"].as_u64().unwrap() >= 10_000);
    assert!(started["os_pid"].as_i64().unwrap() > 0);
    assert!(started["tty_name"].as_str().unwrap().starts_with("/dev/"));

    registry
        .close(json!({"pid": handle_of(&started)}))
        .await
        .unwrap();
}

#[tokio::test]
async fn shell_exit_code_is_observed_and_frozen() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    registry
        .write(json!({"pid": pid, "data": encode_base64(b"exit 7\n")}))
        .await
        .unwrap();

    let out = read_until_exit(&registry, pid).await;
    assert_eq!(out["exit_code"], 7);

    for _ in 0..3 {
        let again = registry.read(json!({"pid": pid})).await.unwrap();
        assert_eq!(again["exited"], true);
        assert_eq!(again["exit_code"], 7);
    }

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn write_reports_bytes_written() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    let written = registry
        .write(json!({"pid": pid, "data": encode_base64(b"exit 0\n")}))
        .await
        .unwrap();
    assert_eq!(written["written"], 7);

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn read_echoes_terminal_output() {
    let registry = PtyRegistry::new();
    let started = registry
        .start(json!({"cmd": "/bin/sh", "args": ["-c", "echo from-the-pty"]}))
        .await
        .unwrap();
    let pid = handle_of(&started);

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut collected = String::new();
    loop {
        let out = registry
            .read(json!({"pid": pid, "timeout_ms": 200}))
            .await
            .unwrap();
        if let Some(text) = out["output"].as_str() {
            assert_eq!(out["output_encoding"], "text");
            collected.push_str(text);
        }
        if collected.contains("from-the-pty") {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "output never arrived: {collected:?}"
        );
    }

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn read_of_unknown_handle_is_idempotent_terminal_shape() {
    let registry = PtyRegistry::new();
    let out = registry.read(json!({"pid": 99_999})).await.unwrap();
    assert_eq!(
        out,
        json!({
            "output": null,
            "output_encoding": null,
            "exited": true,
            "exit_code": null,
        })
    );
}

#[tokio::test]
async fn close_evicts_and_second_close_is_process_error() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    registry.close(json!({"pid": pid})).await.unwrap();
    let failure = registry.close(json!({"pid": pid})).await.unwrap_err();
    assert_eq!(failure.code(), crate::rpc::error::codes::PROCESS_ERROR);

    // Post-close read stays the idempotent terminal shape.
    let out = registry.read(json!({"pid": pid})).await.unwrap();
    assert_eq!(out["exited"], true);
    assert_eq!(out["exit_code"], Value::Null);
}

#[tokio::test]
async fn sigkill_evicts_the_record() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    registry
        .kill(json!({"pid": pid, "signal": "SIGKILL"}))
        .await
        .unwrap();

    let failure = registry
        .write(json!({"pid": pid, "data": encode_base64(b"x")}))
        .await
        .unwrap_err();
    assert_eq!(failure.code(), crate::rpc::error::codes::PROCESS_ERROR);
}

#[tokio::test]
async fn sigterm_keeps_the_record() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    registry.kill(json!({"pid": pid})).await.unwrap();

    let listing = registry.list().await.unwrap();
    assert!(listing["processes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|entry| entry["pid"] == pid));

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn signal_death_reads_as_128_plus_signo() {
    let registry = PtyRegistry::new();
    // An interactive shell may ignore SIGTERM; cat does not.
    let started = registry.start(json!({"cmd": "/bin/cat"})).await.unwrap();
    let pid = handle_of(&started);

    registry
        .kill(json!({"pid": pid, "signal": "TERM"}))
        .await
        .unwrap();
    let out = read_until_exit(&registry, pid).await;
    assert_eq!(out["exit_code"], 128 + 15);

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn resize_succeeds_and_is_visible_to_the_child() {
    let registry = PtyRegistry::new();
    let pid = start_shell(&registry).await;

    registry
        .resize(json!({"pid": pid, "rows": 40, "cols": 120}))
        .await
        .unwrap();

    registry
        .write(json!({"pid": pid, "data": encode_base64(b"stty size; exit\n")}))
        .await
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut collected = String::new();
    loop {
        let out = registry
            .read(json!({"pid": pid, "timeout_ms": 200}))
            .await
            .unwrap();
        if let Some(text) = out["output"].as_str() {
            collected.push_str(text);
        }
        if collected.contains("40 120") || out["exited"] == true {
            break;
        }
        assert!(Instant::now() < deadline, "no stty output: {collected:?}");
    }
    assert!(collected.contains("40 120"), "{collected:?}");

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn list_reports_tty_and_refreshes_exit() {
    let registry = PtyRegistry::new();
    let started = registry
        .start(json!({"cmd": "/bin/sh", "args": ["-c", "exit 5"]}))
        .await
        .unwrap();
    let pid = handle_of(&started);

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let listing = registry.list().await.unwrap();
        let entry = listing["processes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|entry| entry["pid"] == pid)
            .cloned()
            .unwrap();
        assert!(entry["tty_name"].as_str().unwrap().starts_with("/dev/"));
        if entry["exited"] == true {
            assert_eq!(entry["exit_code"], 5);
            break;
        }
        assert!(Instant::now() < deadline, "list never saw the exit");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    registry.close(json!({"pid": pid})).await.unwrap();
}

#[tokio::test]
async fn mutating_ops_on_unknown_handles_are_process_errors() {
    let registry = PtyRegistry::new();
    for failure in [
        registry
            .write(json!({"pid": 77_777, "data": ""}))
            .await
            .unwrap_err(),
        registry
            .resize(json!({"pid": 77_777, "rows": 1, "cols": 1}))
            .await
            .unwrap_err(),
        registry.kill(json!({"pid": 77_777})).await.unwrap_err(),
        registry.close(json!({"pid": 77_777})).await.unwrap_err(),
    ] {
        assert_eq!(failure.code(), crate::rpc::error::codes::PROCESS_ERROR);
    }
}
