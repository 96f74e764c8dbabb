//! Async line streams over child output (non-UTF8-safe).
//!
//! Dev servers and native build tooling can emit non-UTF8 bytes on
//! stdout/stderr, and `BufReader::lines()` gives up on the first invalid
//! sequence. Output is read as raw chunks and split by a [`LineBuffer`], which
//! decodes each complete line lossily and carries partial lines across chunk
//! boundaries.

use std::pin::Pin;

use async_stream::stream;
use futures_util::Stream;
use stackprobe_core::LineBuffer;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// A lazy, unbounded stream of output lines.
pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

const CHUNK_SIZE: usize = 4096;

/// Turn a byte reader into a line stream.
///
/// The stream ends at EOF or on the first read error; an unterminated final
/// fragment is yielded before it ends.
pub fn line_stream(
    mut reader: impl AsyncRead + Unpin + Send + 'static,
    label: &'static str,
) -> LineStream {
    Box::pin(stream! {
        let mut buffer = LineBuffer::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    for line in buffer.push(&chunk[..n]) {
                        yield line;
                    }
                }
                Err(e) => {
                    debug!(stream = label, error = %e, "Output reader exiting due to read error");
                    break;
                }
            }
        }

        if let Some(rest) = buffer.finish() {
            yield rest;
        }
        debug!(stream = label, "Output stream ended");
    })
}
