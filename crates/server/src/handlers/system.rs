// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! System information handlers.

use std::path::PathBuf;

use nix::unistd::{getgid, getgroups, gethostname, getuid, Group, User};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;

use super::blocking;

/// Server and host identity: version, platform, and the requesting user.
pub async fn info(_p: Value) -> Result<Value, RpcFailure> {
    blocking(move || {
        let uid = getuid();
        let account = User::from_uid(uid).ok().flatten();

        let home = std::env::var("HOME").ok().or_else(|| {
            account
                .as_ref()
                .map(|user| user.dir.to_string_lossy().into_owned())
        });
        let user = std::env::var("USER")
            .ok()
            .or_else(|| account.as_ref().map(|user| user.name.clone()));

        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "hostname": gethostname()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "uid": uid.as_raw(),
            "gid": getgid().as_raw(),
            "home": home,
            "user": user,
        }))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct GetenvParams {
    name: String,
}

pub async fn getenv(p: Value) -> Result<Value, RpcFailure> {
    let p: GetenvParams = params(p)?;
    match std::env::var(&p.name) {
        Ok(value) => Ok(json!(value)),
        Err(_) => Ok(Value::Null),
    }
}

#[derive(Debug, Deserialize)]
struct ExpandPathParams {
    path: String,
}

/// Tilde-expand and absolutize a path without resolving symlinks.
pub async fn expand_path(p: Value) -> Result<Value, RpcFailure> {
    let p: ExpandPathParams = params(p)?;
    blocking(move || {
        let expanded = expand_user(&p.path);
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()
                .map_err(|e| RpcFailure::Io(e.to_string()))?
                .join(expanded)
        };
        Ok(json!({ "path": absolute.to_string_lossy() }))
    })
    .await
}

/// Expand a leading `~` or `~user`; unknown users are left untouched.
fn expand_user(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    } else if let Some(rest) = path.strip_prefix('~') {
        let (name, tail) = match rest.split_once('/') {
            Some((name, tail)) => (name, Some(tail)),
            None => (rest, None),
        };
        if let Ok(Some(account)) = User::from_name(name) {
            return match tail {
                Some(tail) => account.dir.join(tail),
                None => account.dir,
            };
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).or_else(|| {
        User::from_uid(getuid())
            .ok()
            .flatten()
            .map(|account| account.dir)
    })
}

#[derive(Debug, Deserialize)]
struct StatvfsParams {
    path: PathBuf,
}

/// Filesystem capacity at `path`, in bytes.
pub async fn statvfs(p: Value) -> Result<Value, RpcFailure> {
    let p: StatvfsParams = params(p)?;
    blocking(move || {
        let stats = nix::sys::statvfs::statvfs(&p.path)
            .map_err(|e| RpcFailure::from_errno(e, &p.path.display().to_string()))?;
        let fragment = stats.fragment_size() as u64;
        Ok(json!({
            "total": stats.blocks() as u64 * fragment,
            "free": stats.blocks_free() as u64 * fragment,
            "available": stats.blocks_available() as u64 * fragment,
        }))
    })
    .await
}

/// Supplementary groups of the server process.
pub async fn groups(_p: Value) -> Result<Value, RpcFailure> {
    blocking(move || {
        let gids = getgroups().map_err(|e| RpcFailure::Io(e.to_string()))?;
        let mut groups = Vec::with_capacity(gids.len());
        for gid in gids {
            let name = Group::from_gid(gid).ok().flatten().map(|group| group.name);
            groups.push(json!({ "gid": gid.as_raw(), "name": name }));
        }
        Ok(json!({ "groups": groups }))
    })
    .await
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
