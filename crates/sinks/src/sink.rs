//! Channel-draining file sink
//!
//! Each call to [`WriterSink::process`] drains up to `batch_size` events in
//! one channel transaction, appends them to the writer and syncs before
//! committing. A failed write rolls the transaction back so the events are
//! delivered again later (at-least-once).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use spool_channel::{Channel, Transaction};
use spool_metrics::SinkCounters;
use spool_protocol::Event;

use crate::codec::CompressionCodec;
use crate::error::{Result, SinkError};
use crate::formatter::EventFormatter;
use crate::fs::FileSystem;
use crate::rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
use crate::writer::{DurableWriter, WriterConfig};

/// Default events per transaction
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default events per file before rolling
pub const DEFAULT_ROLL_COUNT: u64 = 10_000;

/// Default pause after an empty or failed batch
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// File sink settings
#[derive(Debug, Clone)]
pub struct WriterSinkConfig {
    /// Directory output files are created in
    pub directory: PathBuf,
    /// File name prefix: `<prefix>.<counter><codec extension>`
    pub file_prefix: String,
    pub codec: CompressionCodec,
    /// Maximum events per transaction (capped at the channel's
    /// transaction capacity)
    pub batch_size: usize,
    /// Events per file before rolling to the next; 0 never rolls
    pub roll_count: u64,
    /// Reopen existing files in append mode
    pub append: bool,
    /// Pause used by [`WriterSink::run`] after `Backoff`
    pub backoff: Duration,
}

impl WriterSinkConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            file_prefix: "events".into(),
            codec: CompressionCodec::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            roll_count: DEFAULT_ROLL_COUNT,
            append: false,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Outcome of one drain step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// A batch was written and committed
    Ready,
    /// Nothing to drain, or the batch failed and was rolled back
    Backoff,
}

/// Drains one channel into rolling files through a [`DurableWriter`]
pub struct WriterSink {
    name: String,
    channel: Channel,
    writer: DurableWriter,
    config: WriterSinkConfig,
    counters: Arc<SinkCounters>,
    error_logger: RateLimitedLogger,
    /// Counter used in the next file name
    file_counter: u64,
    /// Events committed into the open file
    events_in_file: u64,
}

impl WriterSink {
    pub fn new(
        name: impl Into<String>,
        channel: Channel,
        fs: Arc<dyn FileSystem>,
        formatter: Box<dyn EventFormatter>,
        config: WriterSinkConfig,
        counters: Arc<SinkCounters>,
    ) -> Self {
        let name = name.into();
        let writer = DurableWriter::with_counters(
            fs,
            formatter,
            WriterConfig {
                codec: config.codec,
                append: config.append,
            },
            Arc::clone(&counters),
        );
        let error_logger = RateLimitedLogger::new(name.clone(), DEFAULT_LOG_INTERVAL);

        Self {
            name,
            channel,
            writer,
            config,
            counters,
            error_logger,
            file_counter: initial_counter(),
            events_in_file: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    #[inline]
    pub fn writer(&self) -> &DurableWriter {
        &self.writer
    }

    #[inline]
    pub fn counters(&self) -> &Arc<SinkCounters> {
        &self.counters
    }

    /// Drain and write one batch
    ///
    /// # Errors
    ///
    /// Only transaction state errors are returned; write failures roll back
    /// and report [`SinkStatus::Backoff`].
    pub fn process(&mut self) -> Result<SinkStatus> {
        let mut tx = self.channel.transaction();
        tx.begin()?;

        let limit = self
            .config
            .batch_size
            .min(self.channel.transaction_capacity());
        let mut batch = Vec::with_capacity(limit.min(1024));
        while batch.len() < limit {
            match tx.take() {
                Ok(Some(event)) => batch.push(event),
                Ok(None) => break,
                Err(e) => {
                    tx.rollback()?;
                    return Err(e.into());
                }
            }
        }

        if batch.is_empty() {
            tx.commit()?;
            return Ok(SinkStatus::Backoff);
        }

        match self.write_batch(&batch) {
            Ok(bytes) => {
                tx.commit()?;
                tx.close();
                self.events_in_file += batch.len() as u64;
                self.counters.record_batch(batch.len() as u64, bytes);
                tracing::trace!(sink = %self.name, events = batch.len(), "batch committed");
                self.maybe_roll();
                Ok(SinkStatus::Ready)
            }
            Err(e) => {
                self.rollback(tx, &e);
                Ok(SinkStatus::Backoff)
            }
        }
    }

    /// Loop on [`process`](Self::process) until `running` turns false
    ///
    /// The open file is closed on the way out.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        tracing::info!(sink = %self.name, channel = %self.channel.name(), "sink started");

        while running.load(Ordering::Relaxed) {
            match self.process() {
                Ok(SinkStatus::Ready) => {}
                Ok(SinkStatus::Backoff) => {
                    if running.load(Ordering::Relaxed) && !self.config.backoff.is_zero() {
                        std::thread::sleep(self.config.backoff);
                    }
                }
                Err(e) => {
                    tracing::error!(sink = %self.name, error = %e, "sink stopped on error");
                    self.stop()?;
                    return Err(e);
                }
            }
        }

        self.stop()
    }

    /// Close the current file
    pub fn stop(&mut self) -> Result<()> {
        let result = self.writer.close();
        self.events_in_file = 0;
        tracing::info!(sink = %self.name, "sink stopped");
        result
    }

    /// Append and sync a batch, returning the body bytes written
    fn write_batch(&mut self, batch: &[Event]) -> Result<u64> {
        if !self.writer.is_open() {
            self.open_next_file()?;
        }
        let mut bytes = 0u64;
        for event in batch {
            self.writer.append(event)?;
            bytes += event.body_len() as u64;
        }
        self.writer.sync()?;
        Ok(bytes)
    }

    fn open_next_file(&mut self) -> Result<()> {
        let file_name = format!(
            "{}.{}{}",
            self.config.file_prefix,
            self.file_counter,
            self.config.codec.file_extension()
        );
        self.file_counter += 1;
        self.events_in_file = 0;
        self.writer.open(self.config.directory.join(file_name))
    }

    fn rollback(&mut self, mut tx: Transaction, error: &SinkError) {
        self.error_logger.error("sink write failed, batch rolled back", error);
        if let Err(e) = tx.rollback() {
            tracing::warn!(sink = %self.name, error = %e, "rollback failed");
        }
        tx.close();

        // The stream may hold a partial frame; start over in a new file
        if let Err(e) = self.writer.close() {
            tracing::debug!(sink = %self.name, error = %e, "close after failed write");
        }
        self.events_in_file = 0;
    }

    fn maybe_roll(&mut self) {
        if self.config.roll_count == 0 || self.events_in_file < self.config.roll_count {
            return;
        }
        tracing::debug!(sink = %self.name, events = self.events_in_file, "rolling output file");
        if let Err(e) = self.writer.close() {
            self.error_logger.error("close on roll failed", &e);
        }
        self.events_in_file = 0;
    }
}

impl std::fmt::Debug for WriterSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink")
            .field("name", &self.name)
            .field("channel", &self.channel.name())
            .field("writer", &self.writer)
            .field("events_in_file", &self.events_in_file)
            .finish()
    }
}

/// File counters start at the current epoch milliseconds so restarts do
/// not reuse names
fn initial_counter() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
