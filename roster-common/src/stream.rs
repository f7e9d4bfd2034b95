// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Reassembly of provider response bodies.
//!
//! Both entry points collect raw bytes until the source is exhausted and only
//! then decode UTF-8. Decoding chunk by chunk corrupts any multi-byte
//! character that straddles a chunk boundary, so it is never done here.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::PipelineError;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Drain a push-style chunk stream and decode it as one UTF-8 string.
pub async fn decode_chunks<S, B, E>(mut chunks: S) -> Result<String, PipelineError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut buffer = Vec::new();
    let mut chunk_count = 0_usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| PipelineError::StreamRead {
            received: buffer.len(),
            message: e.to_string(),
        })?;
        buffer.extend_from_slice(chunk.as_ref());
        chunk_count += 1;
    }

    debug!(chunk_count, bytes = buffer.len(), "response stream drained");
    into_text(buffer)
}

/// Drain a pull-style reader until EOF and decode it as one UTF-8 string.
pub async fn decode_reader<R>(mut reader: R) -> Result<String, PipelineError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut scratch = vec![0_u8; READ_BUFFER_SIZE];
    loop {
        let read = reader
            .read(&mut scratch)
            .await
            .map_err(|e| PipelineError::StreamRead {
                received: buffer.len(),
                message: e.to_string(),
            })?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&scratch[..read]);
    }

    debug!(bytes = buffer.len(), "response reader drained");
    into_text(buffer)
}

fn into_text(buffer: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(buffer).map_err(|e| {
        let reason = format!("response body is not valid UTF-8: {}", e.utf8_error());
        PipelineError::malformed(reason, String::from_utf8_lossy(e.as_bytes()).into_owned())
    })
}
