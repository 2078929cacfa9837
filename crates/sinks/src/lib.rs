//! Spool Sinks - Durable file output
//!
//! Sinks drain a channel in transactions and persist what they take. The
//! transaction is only committed after the data has been synced, so a
//! failed write leaves the events in the channel for the next attempt.
//!
//! # Architecture
//!
//! ```text
//! [Channel] --take--> [WriterSink] --append--> [DurableWriter]
//!                                                   |
//!                                   [EventFormatter] -> [CompressedStream] -> [FileSystem]
//! ```
//!
//! # Components
//!
//! | Type | Purpose |
//! |------|---------|
//! | `WriterSink` | Batch drain loop with rolling output files |
//! | `DurableWriter` | open / append / sync / close lifecycle for one file |
//! | `CompressedStream` | Stream that can be finished and resumed (`none`, `lz4`) |
//! | `FormatterRegistry` | Resolves formatter names to `EventFormatter`s |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spool_sinks::{FormatterRegistry, LocalFileSystem, WriterSink, WriterSinkConfig};
//!
//! let formatter = FormatterRegistry::new().get("Text", &Default::default())?;
//! let mut sink = WriterSink::new(
//!     "files",
//!     channel,
//!     Arc::new(LocalFileSystem::new()),
//!     formatter,
//!     WriterSinkConfig::new("/var/spool/events"),
//!     counters,
//! );
//! sink.run(&running)?;
//! ```

mod codec;
mod error;
mod formatter;
mod fs;
mod rate_limited_logger;
mod sink;
mod writer;

pub use codec::{CompressedStream, CompressionCodec};
pub use error::{FormatterError, Result, SinkError};
pub use formatter::{
    BuiltinFormatter, DEFAULT_FORMATTER, EventFormatter, FormatterFactory, FormatterOptions,
    FormatterRegistry, HeaderAndTextFormatter, JsonFormatter, TextFormatter, WRITABLE_MAGIC,
    WritableFormatter,
};
pub use fs::{DEFAULT_BUFFER_SIZE, DurableOutput, FileSystem, LocalFileSystem};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
pub use sink::{
    DEFAULT_BACKOFF, DEFAULT_BATCH_SIZE, DEFAULT_ROLL_COUNT, SinkStatus, WriterSink,
    WriterSinkConfig,
};
pub use writer::{DurableWriter, WriterConfig};
