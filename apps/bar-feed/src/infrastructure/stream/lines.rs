//! Chunked-Body Line Reader
//!
//! Reads newline-delimited lines out of a streaming HTTP response
//! body, one at a time, in strict arrival order. Every read is
//! bounded by the idle timeout and resolves to a tagged outcome
//! instead of an error type: the session dispatches on the tag with
//! one recovery policy per variant.

use std::time::Duration;

use reqwest::Response;

/// Outcome of one bounded line read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete line arrived.
    Line(String),
    /// The server closed the body; the stream ended.
    EndOfStream,
    /// No data arrived within the idle timeout.
    Timeout,
    /// The transport failed mid-read (reset, broken pipe, connect
    /// loss).
    ConnectionFault(String),
    /// The body is unusable as a line stream (bad encoding, HTTP
    /// framing error).
    ProtocolFault(String),
    /// Anything else; not retried, surfaced to the caller as-is.
    Fault(String),
}

/// Line reader over a chunked response body.
pub struct LineStream {
    response: Response,
    buf: Vec<u8>,
    idle_timeout: Duration,
    body_done: bool,
}

impl LineStream {
    /// Wrap a streaming response.
    #[must_use]
    pub const fn new(response: Response, idle_timeout: Duration) -> Self {
        Self {
            response,
            buf: Vec::new(),
            idle_timeout,
            body_done: false,
        }
    }

    /// Read the next line, waiting at most the idle timeout for new
    /// bytes.
    pub async fn next_line(&mut self) -> ReadOutcome {
        loop {
            if let Some(outcome) = self.take_buffered_line() {
                return outcome;
            }

            if self.body_done {
                return self.drain_tail();
            }

            match tokio::time::timeout(self.idle_timeout, self.response.chunk()).await {
                Err(_) => return ReadOutcome::Timeout,
                Ok(Ok(Some(chunk))) => self.buf.extend_from_slice(&chunk),
                Ok(Ok(None)) => self.body_done = true,
                Ok(Err(e)) => return classify_read_error(&e),
            }
        }
    }

    /// Pop one complete line off the buffer, if present.
    fn take_buffered_line(&mut self) -> Option<ReadOutcome> {
        let newline = self.buf.iter().position(|&b| b == b'\n')?;
        let mut raw: Vec<u8> = self.buf.drain(..=newline).collect();
        raw.pop(); // the newline itself
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        Some(bytes_to_line(raw))
    }

    /// Emit whatever trails the final newline, then end the stream.
    fn drain_tail(&mut self) -> ReadOutcome {
        if self.buf.is_empty() {
            return ReadOutcome::EndOfStream;
        }
        let raw = std::mem::take(&mut self.buf);
        bytes_to_line(raw)
    }
}

fn bytes_to_line(raw: Vec<u8>) -> ReadOutcome {
    match String::from_utf8(raw) {
        Ok(line) => ReadOutcome::Line(line),
        Err(e) => ReadOutcome::ProtocolFault(format!("line is not valid UTF-8: {e}")),
    }
}

/// Map a body-read error onto the recovery taxonomy.
fn classify_read_error(e: &reqwest::Error) -> ReadOutcome {
    if e.is_timeout() {
        ReadOutcome::Timeout
    } else if e.is_connect() || e.is_body() || e.is_request() {
        ReadOutcome::ConnectionFault(e.to_string())
    } else if e.is_decode() {
        ReadOutcome::ProtocolFault(e.to_string())
    } else {
        ReadOutcome::Fault(e.to_string())
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream")
            .field("buffered_bytes", &self.buf.len())
            .field("idle_timeout", &self.idle_timeout)
            .field("body_done", &self.body_done)
            .finish_non_exhaustive()
    }
}
