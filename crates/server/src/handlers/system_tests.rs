// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use serde_json::json;

#[tokio::test]
async fn info_reports_identity_and_platform() {
    let out = info(json!({})).await.unwrap();
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(out["os"], std::env::consts::OS);
    assert_eq!(out["arch"], std::env::consts::ARCH);
    assert_eq!(out["uid"], nix::unistd::getuid().as_raw());
    assert_eq!(out["gid"], nix::unistd::getgid().as_raw());
    assert!(out["hostname"].is_string());
}

#[tokio::test]
async fn getenv_returns_value_or_null() {
    let out = getenv(json!({"name": "PATH"})).await.unwrap();
    assert!(out.is_string());

    let out = getenv(json!({"name": "REMOTED_SURELY_UNSET_VAR"})).await.unwrap();
    assert!(out.is_null());
}

#[tokio::test]
async fn expand_path_resolves_bare_tilde() {
    let Ok(home) = std::env::var("HOME") else {
        return;
    };
    let out = expand_path(json!({"path": "~"})).await.unwrap();
    assert_eq!(out["path"].as_str().unwrap(), home);

    let out = expand_path(json!({"path": "~/sub/file"})).await.unwrap();
    assert_eq!(
        out["path"].as_str().unwrap(),
        format!("{home}/sub/file")
    );
}

#[tokio::test]
async fn expand_path_absolutizes_relative_paths() {
    let cwd = std::env::current_dir().unwrap();
    let out = expand_path(json!({"path": "some/rel"})).await.unwrap();
    assert_eq!(
        out["path"].as_str().unwrap(),
        cwd.join("some/rel").to_str().unwrap()
    );
}

#[tokio::test]
async fn expand_path_leaves_absolute_paths_alone() {
    let out = expand_path(json!({"path": "/usr/bin"})).await.unwrap();
    assert_eq!(out["path"], "/usr/bin");
}

#[tokio::test]
async fn expand_path_leaves_unknown_user_untouched() {
    let cwd = std::env::current_dir().unwrap();
    let out = expand_path(json!({"path": "~no-such-user-here/x"}))
        .await
        .unwrap();
    assert_eq!(
        out["path"].as_str().unwrap(),
        cwd.join("~no-such-user-here/x").to_str().unwrap()
    );
}

#[tokio::test]
async fn statvfs_reports_consistent_byte_counts() {
    let out = statvfs(json!({"path": "/"})).await.unwrap();
    let total = out["total"].as_u64().unwrap();
    let free = out["free"].as_u64().unwrap();
    let available = out["available"].as_u64().unwrap();
    assert!(total > 0);
    assert!(free <= total);
    assert!(available <= free);
}

#[tokio::test]
async fn statvfs_of_missing_path_is_file_not_found() {
    let failure = statvfs(json!({"path": "/definitely/missing"}))
        .await
        .unwrap_err();
    assert_eq!(failure.code(), crate::rpc::error::codes::FILE_NOT_FOUND);
}

#[tokio::test]
async fn groups_lists_gid_name_pairs() {
    let out = groups(json!({})).await.unwrap();
    for entry in out["groups"].as_array().unwrap() {
        assert!(entry["gid"].is_u64());
        assert!(entry["name"].is_string() || entry["name"].is_null());
    }
}
