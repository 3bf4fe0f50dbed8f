// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! File metadata and I/O handlers.
//!
//! Payload bytes (`content`) are base64 on the wire in both directions.
//! Paths are used as given; relative paths resolve against the server's
//! working directory.

use std::fs::{File, FileTimes, OpenOptions, Permissions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{symlink, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nix::unistd::{AccessFlags, Gid, Uid};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::encoding::{decode_base64, encode_base64};
use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;
use crate::rpc::protocol::ErrorObject;

use super::{attrs, blocking, to_value};

fn io_err(err: &std::io::Error, path: &Path) -> RpcFailure {
    RpcFailure::from_io(err, &path.display().to_string())
}

#[derive(Debug, Deserialize)]
struct PathParams {
    path: PathBuf,
}

// ============================================================================
// Metadata
// ============================================================================

pub async fn stat(p: Value) -> Result<Value, RpcFailure> {
    let p: PathParams = params(p)?;
    blocking(move || to_value(attrs::stat_path(&p.path)?)).await
}

#[derive(Debug, Deserialize)]
struct StatBatchParams {
    paths: Vec<PathBuf>,
}

/// Stat many paths concurrently; per-path failures stay in the result.
pub async fn stat_batch(p: Value) -> Result<Value, RpcFailure> {
    let p: StatBatchParams = params(p)?;

    let mut tasks = Vec::with_capacity(p.paths.len());
    for path in p.paths {
        tasks.push(tokio::task::spawn_blocking(move || attrs::stat_path(&path)));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        let outcome = task
            .await
            .map_err(|e| RpcFailure::Internal(e.to_string()))?;
        results.push(match outcome {
            Ok(record) => to_value(record)?,
            Err(failure) => json!({ "error": ErrorObject::from(&failure) }),
        });
    }
    Ok(json!({ "results": results }))
}

pub async fn exists(p: Value) -> Result<Value, RpcFailure> {
    let p: PathParams = params(p)?;
    blocking(move || Ok(json!(std::fs::metadata(&p.path).is_ok()))).await
}

pub async fn readable(p: Value) -> Result<Value, RpcFailure> {
    access_check(p, AccessFlags::R_OK).await
}

pub async fn writable(p: Value) -> Result<Value, RpcFailure> {
    access_check(p, AccessFlags::W_OK).await
}

pub async fn executable(p: Value) -> Result<Value, RpcFailure> {
    access_check(p, AccessFlags::X_OK).await
}

async fn access_check(p: Value, flags: AccessFlags) -> Result<Value, RpcFailure> {
    let p: PathParams = params(p)?;
    blocking(move || Ok(json!(nix::unistd::access(&p.path, flags).is_ok()))).await
}

pub async fn truename(p: Value) -> Result<Value, RpcFailure> {
    let p: PathParams = params(p)?;
    blocking(move || {
        let resolved = std::fs::canonicalize(&p.path).map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({ "path": resolved.to_string_lossy() }))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct NewerThanParams {
    file1: PathBuf,
    file2: PathBuf,
}

/// True iff `file1` is strictly newer than `file2`. A missing `file1` is
/// never newer; a missing `file2` makes an existing `file1` newer.
pub async fn newer_than(p: Value) -> Result<Value, RpcFailure> {
    let p: NewerThanParams = params(p)?;
    blocking(move || {
        let Ok(meta1) = std::fs::metadata(&p.file1) else {
            return Ok(json!(false));
        };
        let Ok(meta2) = std::fs::metadata(&p.file2) else {
            return Ok(json!(true));
        };
        Ok(json!(meta1.mtime() > meta2.mtime()))
    })
    .await
}

// ============================================================================
// Content I/O
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReadParams {
    path: PathBuf,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default)]
    length: Option<u64>,
}

pub async fn read(p: Value) -> Result<Value, RpcFailure> {
    let p: ReadParams = params(p)?;
    blocking(move || {
        let mut file = File::open(&p.path).map_err(|e| io_err(&e, &p.path))?;
        if let Some(offset) = p.offset {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| io_err(&e, &p.path))?;
        }
        let mut content = Vec::new();
        match p.length {
            Some(length) => {
                file.take(length)
                    .read_to_end(&mut content)
                    .map_err(|e| io_err(&e, &p.path))?;
            }
            None => {
                file.read_to_end(&mut content)
                    .map_err(|e| io_err(&e, &p.path))?;
            }
        }
        Ok(json!({ "content": encode_base64(&content), "size": content.len() }))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct WriteParams {
    path: PathBuf,
    content: String,
    #[serde(default)]
    mode: Option<u32>,
    #[serde(default)]
    append: bool,
    #[serde(default)]
    offset: Option<u64>,
}

pub async fn write(p: Value) -> Result<Value, RpcFailure> {
    let p: WriteParams = params(p)?;
    let data = decode_base64(&p.content)
        .map_err(|e| RpcFailure::invalid_params(format!("invalid base64 content: {e}")))?;

    blocking(move || {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if p.append {
            options.append(true);
        } else if p.offset.is_none() {
            options.truncate(true);
        }
        if let Some(mode) = p.mode {
            options.mode(mode);
        }

        let mut file = options.open(&p.path).map_err(|e| io_err(&e, &p.path))?;
        if let Some(offset) = p.offset {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| io_err(&e, &p.path))?;
        }
        file.write_all(&data).map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({ "written": data.len() }))
    })
    .await
}

// ============================================================================
// Mutations
// ============================================================================

#[derive(Debug, Deserialize)]
struct TransferParams {
    source: PathBuf,
    destination: PathBuf,
}

pub async fn copy(p: Value) -> Result<Value, RpcFailure> {
    let p: TransferParams = params(p)?;
    blocking(move || {
        std::fs::copy(&p.source, &p.destination).map_err(|e| io_err(&e, &p.source))?;
        Ok(json!({}))
    })
    .await
}

pub async fn rename(p: Value) -> Result<Value, RpcFailure> {
    let p: TransferParams = params(p)?;
    blocking(move || {
        std::fs::rename(&p.source, &p.destination).map_err(|e| io_err(&e, &p.source))?;
        Ok(json!({}))
    })
    .await
}

pub async fn delete(p: Value) -> Result<Value, RpcFailure> {
    let p: PathParams = params(p)?;
    blocking(move || {
        std::fs::remove_file(&p.path).map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct SetModesParams {
    path: PathBuf,
    mode: u32,
}

pub async fn set_modes(p: Value) -> Result<Value, RpcFailure> {
    let p: SetModesParams = params(p)?;
    blocking(move || {
        std::fs::set_permissions(&p.path, Permissions::from_mode(p.mode))
            .map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct SetTimesParams {
    path: PathBuf,
    #[serde(default)]
    atime: Option<i64>,
    #[serde(default)]
    mtime: Option<i64>,
}

/// Set access/modification times (integer seconds); a missing field means
/// "now".
pub async fn set_times(p: Value) -> Result<Value, RpcFailure> {
    let p: SetTimesParams = params(p)?;
    blocking(move || {
        let times = FileTimes::new()
            .set_accessed(epoch_time(p.atime))
            .set_modified(epoch_time(p.mtime));
        let file = File::open(&p.path).map_err(|e| io_err(&e, &p.path))?;
        file.set_times(times).map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

fn epoch_time(seconds: Option<i64>) -> SystemTime {
    match seconds {
        Some(s) if s >= 0 => UNIX_EPOCH + Duration::from_secs(s as u64),
        Some(s) => UNIX_EPOCH - Duration::from_secs(s.unsigned_abs()),
        None => SystemTime::now(),
    }
}

#[derive(Debug, Deserialize)]
struct LinkParams {
    target: PathBuf,
    path: PathBuf,
}

pub async fn make_symlink(p: Value) -> Result<Value, RpcFailure> {
    let p: LinkParams = params(p)?;
    blocking(move || {
        symlink(&p.target, &p.path).map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

pub async fn make_hardlink(p: Value) -> Result<Value, RpcFailure> {
    let p: LinkParams = params(p)?;
    blocking(move || {
        std::fs::hard_link(&p.target, &p.path).map_err(|e| io_err(&e, &p.target))?;
        Ok(json!({}))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct ChownParams {
    path: PathBuf,
    #[serde(default)]
    uid: Option<u32>,
    #[serde(default)]
    gid: Option<u32>,
}

pub async fn chown(p: Value) -> Result<Value, RpcFailure> {
    let p: ChownParams = params(p)?;
    blocking(move || {
        nix::unistd::chown(
            &p.path,
            p.uid.map(Uid::from_raw),
            p.gid.map(Gid::from_raw),
        )
        .map_err(|e| RpcFailure::from_errno(e, &p.path.display().to_string()))?;
        Ok(json!({}))
    })
    .await
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
