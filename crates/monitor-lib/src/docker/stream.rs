//! Newline-delimited frame reading for the live stats stream

use super::RuntimeError;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tokio::task::JoinHandle;

/// An open stats stream for one container.
///
/// Owns the HTTP connection behind the stream; dropping the stream closes
/// the connection.
pub struct StatsStream {
    body: Incoming,
    lines: LineBuffer,
    conn: JoinHandle<()>,
}

impl StatsStream {
    pub(super) fn new(body: Incoming, conn: JoinHandle<()>) -> Self {
        Self {
            body,
            lines: LineBuffer::default(),
            conn,
        }
    }

    /// Read the next raw frame from the stream.
    ///
    /// Returns `Ok(None)` once the stream has ended cleanly. A trailing
    /// partial line at end of stream is yielded as a final frame.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, RuntimeError> {
        loop {
            if let Some(line) = self.lines.pop_line() {
                return Ok(Some(line));
            }
            match self.body.frame().await {
                Some(Ok(frame)) => {
                    if let Some(data) = frame.data_ref() {
                        self.lines.push(data);
                    }
                }
                Some(Err(err)) => return Err(RuntimeError::Transport(err)),
                None => return Ok(self.lines.take_remainder()),
            }
        }
    }
}

impl Drop for StatsStream {
    fn drop(&mut self) {
        self.conn.abort();
    }
}

/// Accumulates body chunks and splits them into newline-delimited frames.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete line, skipping empty ones.
    fn pop_line(&mut self) -> Option<Bytes> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(line.len() - 1);
            if line.ends_with(b"\r") {
                line.truncate(line.len() - 1);
            }
            if line.is_empty() {
                continue;
            }
            return Some(line.freeze());
        }
        None
    }

    fn take_remainder(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }
}
