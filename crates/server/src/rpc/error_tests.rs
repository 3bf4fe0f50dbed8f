// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use rstest::rstest;

#[rstest]
#[case(RpcFailure::Parse("x".into()), codes::PARSE_ERROR)]
#[case(RpcFailure::InvalidRequest("x".into()), codes::INVALID_REQUEST)]
#[case(RpcFailure::MethodNotFound("x".into()), codes::METHOD_NOT_FOUND)]
#[case(RpcFailure::InvalidParams("x".into()), codes::INVALID_PARAMS)]
#[case(RpcFailure::Internal("x".into()), codes::INTERNAL_ERROR)]
#[case(RpcFailure::FileNotFound("x".into()), codes::FILE_NOT_FOUND)]
#[case(RpcFailure::PermissionDenied("x".into()), codes::PERMISSION_DENIED)]
#[case(RpcFailure::Io("x".into()), codes::IO_ERROR)]
#[case(RpcFailure::Process("x".into()), codes::PROCESS_ERROR)]
fn every_kind_has_its_wire_code(#[case] failure: RpcFailure, #[case] code: i64) {
    assert_eq!(failure.code(), code);
}

#[test]
fn enoent_maps_to_file_not_found_with_path() {
    let err = io::Error::from(io::ErrorKind::NotFound);
    let failure = RpcFailure::from_io(&err, "/missing/file");
    assert_eq!(failure.code(), codes::FILE_NOT_FOUND);
    assert_eq!(failure.to_string(), "File not found: /missing/file");
}

#[test]
fn eacces_maps_to_permission_denied_with_path() {
    let err = io::Error::from(io::ErrorKind::PermissionDenied);
    let failure = RpcFailure::from_io(&err, "/protected");
    assert_eq!(failure.code(), codes::PERMISSION_DENIED);
    assert_eq!(failure.to_string(), "Permission denied: /protected");
}

#[test]
fn other_io_errors_keep_the_host_message() {
    let err = io::Error::new(io::ErrorKind::Other, "disk on fire");
    let failure = RpcFailure::from_io(&err, "/whatever");
    assert_eq!(failure.code(), codes::IO_ERROR);
    assert!(failure.to_string().contains("disk on fire"));
}

#[test]
fn errno_classification_matches_io_classification() {
    assert_eq!(
        RpcFailure::from_errno(Errno::ENOENT, "/p").code(),
        codes::FILE_NOT_FOUND
    );
    assert_eq!(
        RpcFailure::from_errno(Errno::EACCES, "/p").code(),
        codes::PERMISSION_DENIED
    );
    assert_eq!(
        RpcFailure::from_errno(Errno::EPERM, "/p").code(),
        codes::PERMISSION_DENIED
    );
    assert_eq!(
        RpcFailure::from_errno(Errno::EMFILE, "/p").code(),
        codes::IO_ERROR
    );
}

#[test]
fn parse_error_message_is_prefixed() {
    let failure = RpcFailure::Parse("expected value at line 1".into());
    assert_eq!(
        failure.to_string(),
        "Parse error: expected value at line 1"
    );
}

#[test]
fn method_not_found_names_the_method() {
    let failure = RpcFailure::MethodNotFound("no.such".into());
    assert_eq!(failure.to_string(), "Method not found: no.such");
}
