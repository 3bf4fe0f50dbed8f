// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 request pipeline.
//!
//! Framing, envelope validation, method dispatch, and the error taxonomy
//! for the control stream.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod protocol;

pub use dispatch::handle_line;
pub use error::RpcFailure;
