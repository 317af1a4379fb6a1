//! Newline-delimited framing
//!
//! One JSON document per line in both directions. Outgoing frames are
//! flushed one at a time because the peer reads with blocking `readline`.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Splits an async byte stream into complete lines
pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Next complete, non-blank line without its terminator. `Ok(None)` at
    /// end of stream; a trailing fragment with no newline is discarded.
    pub async fn next_frame(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf).await?;
            if read == 0 {
                return Ok(None);
            }

            if self.buf.last() != Some(&b'\n') {
                warn!(bytes = self.buf.len(), "Discarding unterminated fragment at end of stream");
                return Ok(None);
            }

            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }

            let line = String::from_utf8_lossy(&self.buf);
            if line.trim().is_empty() {
                continue;
            }

            debug!("Received: {} bytes", self.buf.len());
            return Ok(Some(line.into_owned()));
        }
    }
}

/// Writes one JSON document per line, flushing after every message
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `message`, append exactly one `\n`, flush
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.write_raw(&line).await
    }

    /// Write an already-encoded line. `line` must end with `\n` and contain no other newline.
    pub async fn write_raw(&mut self, line: &[u8]) -> io::Result<()> {
        debug!("Sending: {} bytes", line.len());
        self.writer.write_all(line).await?;
        self.writer.flush().await
    }
}
