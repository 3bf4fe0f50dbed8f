// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line framing for the control stream.
//!
//! One JSON value per `\n`-terminated line. `serde_json` escapes newlines
//! inside string values, so the only byte 0x0A on the stream is the frame
//! delimiter.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Serialize `message` as one JSON line and flush it.
pub async fn write_line<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(message).map_err(io::Error::other)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
