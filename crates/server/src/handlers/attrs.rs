// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! File attribute records returned by the stat family.

use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};
use serde::Serialize;

use crate::rpc::error::RpcFailure;

/// Entry type as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Chardevice,
    Blockdevice,
    Fifo,
    Socket,
    Unknown,
}

impl From<std::fs::FileType> for FileKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_file() {
            Self::File
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_char_device() {
            Self::Chardevice
        } else if file_type.is_block_device() {
            Self::Blockdevice
        } else if file_type.is_fifo() {
            Self::Fifo
        } else if file_type.is_socket() {
            Self::Socket
        } else {
            Self::Unknown
        }
    }
}

/// Wire form of a stat record (lstat semantics).
#[derive(Debug, Clone, Serialize)]
pub struct FileAttrs {
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub nlinks: u64,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub size: u64,
    /// Raw stat mode bits, permissions and type included.
    pub mode: u32,
    pub inode: u64,
    pub dev: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gname: Option<String>,
    /// Present iff the entry is a symlink and readlink succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
}

/// lstat `path` into a wire attrs record. Blocking.
pub fn stat_path(path: &Path) -> Result<FileAttrs, RpcFailure> {
    let meta = std::fs::symlink_metadata(path)
        .map_err(|e| RpcFailure::from_io(&e, &path.display().to_string()))?;
    Ok(from_metadata(path, &meta))
}

/// Build the attrs record from already-fetched metadata. Blocking (name
/// lookups hit the user/group databases).
pub fn from_metadata(path: &Path, meta: &Metadata) -> FileAttrs {
    let kind = FileKind::from(meta.file_type());
    let link_target = if kind == FileKind::Symlink {
        std::fs::read_link(path)
            .ok()
            .map(|target| target.to_string_lossy().into_owned())
    } else {
        None
    };

    FileAttrs {
        kind,
        nlinks: meta.nlink(),
        uid: meta.uid(),
        gid: meta.gid(),
        atime: meta.atime(),
        mtime: meta.mtime(),
        ctime: meta.ctime(),
        size: meta.size(),
        mode: meta.mode(),
        inode: meta.ino(),
        dev: meta.dev(),
        uname: User::from_uid(Uid::from_raw(meta.uid()))
            .ok()
            .flatten()
            .map(|user| user.name),
        gname: Group::from_gid(Gid::from_raw(meta.gid()))
            .ok()
            .flatten()
            .map(|group| group.name),
        link_target,
    }
}

#[cfg(test)]
#[path = "attrs_tests.rs"]
mod tests;
