// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Directory handlers.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::rpc::dispatch::params;
use crate::rpc::error::RpcFailure;
use crate::rpc::protocol::ErrorObject;

use super::{attrs, blocking, to_value};

fn io_err(err: &std::io::Error, path: &Path) -> RpcFailure {
    RpcFailure::from_io(err, &path.display().to_string())
}

fn read_names(path: &Path) -> Result<Vec<String>, RpcFailure> {
    let entries = std::fs::read_dir(path).map_err(|e| io_err(&e, path))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&e, path))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    path: PathBuf,
    #[serde(default)]
    include_hidden: bool,
    #[serde(default)]
    include_attrs: bool,
}

/// List a directory, sorted by name. `include_hidden` adds the `.` and
/// `..` entries; `include_attrs` attaches a stat record (or a per-entry
/// error object) to each name.
pub async fn list(p: Value) -> Result<Value, RpcFailure> {
    let p: ListParams = params(p)?;
    blocking(move || {
        let mut names = read_names(&p.path)?;
        if p.include_hidden {
            names.push(".".to_owned());
            names.push("..".to_owned());
        }
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let mut entry = json!({ "name": name });
            if p.include_attrs {
                match attrs::stat_path(&p.path.join(&name)) {
                    Ok(record) => {
                        entry["attrs"] = to_value(record)?;
                    }
                    Err(failure) => {
                        entry["error"] = to_value(ErrorObject::from(&failure))?;
                    }
                }
            }
            entries.push(entry);
        }
        Ok(json!({ "entries": entries }))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    path: PathBuf,
    #[serde(default)]
    parents: bool,
}

pub async fn create(p: Value) -> Result<Value, RpcFailure> {
    let p: CreateParams = params(p)?;
    blocking(move || {
        let result = if p.parents {
            std::fs::create_dir_all(&p.path)
        } else {
            std::fs::create_dir(&p.path)
        };
        result.map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct RemoveParams {
    path: PathBuf,
    #[serde(default)]
    recursive: bool,
}

pub async fn remove(p: Value) -> Result<Value, RpcFailure> {
    let p: RemoveParams = params(p)?;
    blocking(move || {
        let result = if p.recursive {
            std::fs::remove_dir_all(&p.path)
        } else {
            std::fs::remove_dir(&p.path)
        };
        result.map_err(|e| io_err(&e, &p.path))?;
        Ok(json!({}))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct CompletionsParams {
    directory: PathBuf,
    #[serde(default)]
    prefix: String,
}

/// Names in `directory` starting with `prefix`, sorted, directories
/// suffixed with `/`.
pub async fn completions(p: Value) -> Result<Value, RpcFailure> {
    let p: CompletionsParams = params(p)?;
    blocking(move || {
        let names = read_names(&p.directory)?;
        let mut completions = Vec::new();
        for name in names {
            if !name.starts_with(&p.prefix) {
                continue;
            }
            let is_dir = p.directory.join(&name).is_dir();
            completions.push(if is_dir { format!("{name}/") } else { name });
        }
        completions.sort();
        Ok(json!({ "completions": completions }))
    })
    .await
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
