// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! remoted binary entry point.
//!
//! No flags: the protocol runs on stdin/stdout, logging goes to stderr
//! (`RUST_LOG` selects the filter).

use std::sync::Arc;

use remoted::server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    Arc::new(Server::new()).run().await
}
