//! Newline-delimited source
//!
//! Each line read becomes one event whose body is the line without its
//! terminator. Every line is answered with `OK` or `FAILED` on the reply
//! writer, so a client can pipeline requests and match replies in order.
//!
//! # Framing
//!
//! Lines end with LF or CRLF. A line longer than `max_line_length` is
//! truncated to that length, the rest of it is discarded, and the truncated
//! body is still delivered.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spool_metrics::SourceCounters;
use spool_pipeline::ChannelProcessor;
use spool_protocol::{Event, Status};

use crate::error::{Result, SourceError};

/// Default maximum line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 512;

/// Line source configuration
#[derive(Debug, Clone)]
pub struct LineSourceConfig {
    /// Longer lines are truncated
    pub max_line_length: usize,

    /// Write an `OK`/`FAILED` reply after every line
    pub ack_every_event: bool,
}

impl Default for LineSourceConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            ack_every_event: true,
        }
    }
}

/// Result of reading one bounded line
#[derive(Debug, PartialEq, Eq)]
enum ReadLine {
    Eof,
    Line,
    Truncated,
}

/// Reads lines from a reader and delivers each as an event
pub struct LineSource {
    name: String,
    processor: ChannelProcessor,
    config: LineSourceConfig,
    counters: Arc<SourceCounters>,
    running: Arc<AtomicBool>,
}

impl LineSource {
    pub fn new(
        name: impl Into<String>,
        processor: ChannelProcessor,
        config: LineSourceConfig,
        counters: Arc<SourceCounters>,
    ) -> Self {
        Self {
            name: name.into(),
            processor,
            config,
            counters,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn processor(&self) -> &ChannelProcessor {
        &self.processor
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Flag shared with [`run`](Self::run); clearing it ends the loop after
    /// the line being handled
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Deliver one line body
    pub fn handle_line(&self, line: &[u8]) -> Status {
        self.counters.record_received(1);
        let event = Event::new(line.to_vec());
        match self.processor.process_event(event) {
            Ok(()) => {
                self.counters.record_accepted();
                Status::Ok
            }
            Err(e) => {
                tracing::debug!(source = %self.name, error = %e, "line rejected");
                self.counters.record_rejected();
                Status::Failed
            }
        }
    }

    /// Read lines until EOF or [`stop`](Self::stop), replying to each
    ///
    /// Returns the number of lines handled.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if reading or replying fails.
    pub fn run<R: BufRead, W: Write>(&self, mut reader: R, mut replies: W) -> Result<u64> {
        tracing::info!(
            source = %self.name,
            max_line_length = self.config.max_line_length,
            "line source started"
        );

        let mut line = Vec::with_capacity(self.config.max_line_length);
        let mut handled = 0u64;

        while self.is_running() {
            let read = read_bounded_line(&mut reader, &mut line, self.config.max_line_length)
                .map_err(|e| SourceError::io(&self.name, "read", e))?;

            match read {
                ReadLine::Eof => break,
                ReadLine::Truncated => {
                    tracing::warn!(
                        source = %self.name,
                        max = self.config.max_line_length,
                        "line exceeded maximum length, truncated"
                    );
                }
                ReadLine::Line => {}
            }

            let status = self.handle_line(&line);
            handled += 1;

            if self.config.ack_every_event {
                writeln!(replies, "{status}")
                    .and_then(|()| replies.flush())
                    .map_err(|e| SourceError::io(&self.name, "reply", e))?;
            }
        }

        tracing::info!(source = %self.name, lines = handled, "line source stopped");
        Ok(handled)
    }
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Read one line into `buf` without its terminator, storing at most
/// `max_size` bytes
///
/// Bytes past the limit are consumed up to the newline and dropped.
fn read_bounded_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_size: usize,
) -> io::Result<ReadLine> {
    buf.clear();

    let mut total_bytes = 0usize;
    let mut truncated = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        if available.is_empty() {
            if total_bytes == 0 {
                return Ok(ReadLine::Eof);
            }
            break;
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let (content_len, consume, done) = match newline_pos {
            Some(pos) if pos > 0 && available[pos - 1] == b'\r' => (pos - 1, pos + 1, true),
            Some(pos) => (pos, pos + 1, true),
            None => (available.len(), available.len(), false),
        };

        let space_remaining = max_size.saturating_sub(buf.len());
        if content_len <= space_remaining {
            buf.extend_from_slice(&available[..content_len]);
        } else {
            buf.extend_from_slice(&available[..space_remaining]);
            truncated = true;
        }

        total_bytes += consume;
        reader.consume(consume);

        if done {
            break;
        }
    }

    // CR stored at the end of an earlier chunk
    if !truncated && buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(if truncated {
        ReadLine::Truncated
    } else {
        ReadLine::Line
    })
}

#[cfg(test)]
#[path = "line_test.rs"]
mod line_test;
