use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::telnet::LineBuffer;

/// Reads Telnet lines from an async byte stream.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    lines: LineBuffer,
    ready: VecDeque<String>,
    chunk: Vec<u8>,
}

impl<R> LineReader<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            lines: LineBuffer::with_max_line_len(max_line_len),
            ready: VecDeque::new(),
            chunk: vec![0u8; 4096],
        }
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Next complete line without its terminator. `Ok(None)` once the peer
    /// closes the stream; an unterminated trailing fragment is dropped.
    ///
    /// Cancel safe: a line is only removed from the queue when returned.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            let n = self.inner.read(&mut self.chunk).await?;
            if n == 0 {
                if self.lines.pending_len() > 0 {
                    tracing::debug!(
                        bytes = self.lines.pending_len(),
                        "Dropping unterminated line at EOF"
                    );
                }
                return Ok(None);
            }
            self.lines.feed_into(&self.chunk[..n], &mut self.ready);
        }
    }
}
