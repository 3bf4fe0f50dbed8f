// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error taxonomy for the request pipeline.
//!
//! Every way a handler can fail maps onto exactly one JSON-RPC error code.
//! Host OS failures are classified by errno: ENOENT and EACCES/EPERM get
//! dedicated codes with the offending path in the message, everything else
//! collapses into a generic I/O error carrying the host error string.

use std::io;

use nix::errno::Errno;

/// JSON-RPC error codes used on the wire.
pub mod codes {
    /// Malformed JSON line.
    pub const PARSE_ERROR: i64 = -32700;
    /// Missing `jsonrpc`, missing `method`, or a non-"2.0" version.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown method name.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Missing or invalid required parameter.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Uncaught fault.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// ENOENT.
    pub const FILE_NOT_FOUND: i64 = -32001;
    /// EACCES or EPERM.
    pub const PERMISSION_DENIED: i64 = -32002;
    /// Any other OS failure.
    pub const IO_ERROR: i64 = -32003;
    /// Process-lifecycle fault.
    pub const PROCESS_ERROR: i64 = -32004;
}

/// A classified request failure.
///
/// The `Display` form is the wire `message`; [`RpcFailure::code`] is the
/// wire `code`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcFailure {
    /// The input line was not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The envelope was malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// No such method in the dispatch table.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Parameters failed shape validation.
    #[error("{0}")]
    InvalidParams(String),

    /// Anything the pipeline did not anticipate.
    #[error("{0}")]
    Internal(String),

    /// ENOENT, with the offending path.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// EACCES / EPERM, with the offending path.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other host OS failure.
    #[error("{0}")]
    Io(String),

    /// Process-lifecycle fault (unknown handle, closed stdin, ...).
    #[error("{0}")]
    Process(String),
}

impl RpcFailure {
    /// Wire error code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => codes::PARSE_ERROR,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::Internal(_) => codes::INTERNAL_ERROR,
            Self::FileNotFound(_) => codes::FILE_NOT_FOUND,
            Self::PermissionDenied(_) => codes::PERMISSION_DENIED,
            Self::Io(_) => codes::IO_ERROR,
            Self::Process(_) => codes::PROCESS_ERROR,
        }
    }

    /// Classify a `std::io::Error` raised while operating on `path`.
    pub fn from_io(err: &io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound(path.to_owned()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_owned()),
            _ => Self::Io(err.to_string()),
        }
    }

    /// Classify a raw errno raised while operating on `path`.
    pub fn from_errno(errno: Errno, path: &str) -> Self {
        match errno {
            Errno::ENOENT => Self::FileNotFound(path.to_owned()),
            Errno::EACCES | Errno::EPERM => Self::PermissionDenied(path.to_owned()),
            _ => Self::Io(errno.to_string()),
        }
    }

    /// INVALID_PARAMS with the given detail.
    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::InvalidParams(detail.to_string())
    }

    /// INTERNAL_ERROR with the given detail.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::Internal(detail.to_string())
    }

    /// PROCESS_ERROR with the given detail.
    pub fn process(detail: impl std::fmt::Display) -> Self {
        Self::Process(detail.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
