//! Durable compressed writer
//!
//! Owns one output file at a time: a [`CompressedStream`] over a
//! [`DurableOutput`], fed by an [`EventFormatter`].
//!
//! `sync` seals the current compressed frame and makes it durable; the next
//! `append` transparently starts a new frame. Calling `sync` repeatedly
//! without appends seals nothing new and writes no extra bytes.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use spool_metrics::SinkCounters;
use spool_protocol::Event;

use crate::codec::{CompressedStream, CompressionCodec};
use crate::error::{Result, SinkError};
use crate::formatter::EventFormatter;
use crate::fs::FileSystem;

/// Writer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterConfig {
    /// Codec used by [`DurableWriter::open`]
    pub codec: CompressionCodec,
    /// Reopen an existing file in append mode instead of truncating it
    pub append: bool,
}

/// Sink-side writer with an idempotent sync/close lifecycle
///
/// Exclusively owned by one sink worker.
pub struct DurableWriter {
    fs: Arc<dyn FileSystem>,
    formatter: Box<dyn EventFormatter>,
    config: WriterConfig,
    counters: Arc<SinkCounters>,
    path: Option<PathBuf>,
    stream: Option<CompressedStream>,
    is_finished: bool,
}

impl DurableWriter {
    pub fn new(fs: Arc<dyn FileSystem>, formatter: Box<dyn EventFormatter>, config: WriterConfig) -> Self {
        Self::with_counters(fs, formatter, config, Arc::new(SinkCounters::new()))
    }

    pub fn with_counters(
        fs: Arc<dyn FileSystem>,
        formatter: Box<dyn EventFormatter>,
        config: WriterConfig,
        counters: Arc<SinkCounters>,
    ) -> Self {
        Self {
            fs,
            formatter,
            config,
            counters,
            path: None,
            stream: None,
            is_finished: false,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether the current frame is sealed (set by `sync`, cleared by `append`)
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Path of the open file
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn config(&self) -> WriterConfig {
        self.config
    }

    /// Name of the formatter encoding events
    pub fn formatter_name(&self) -> &str {
        self.formatter.name()
    }

    /// Codec of the open file
    pub fn codec(&self) -> Option<CompressionCodec> {
        self.stream.as_ref().map(CompressedStream::codec)
    }

    /// Open `path` with the configured codec
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.open_with(path, self.config.codec)
    }

    /// Open `path` with an explicit codec
    ///
    /// An already open file is closed first. With append support enabled and
    /// `path` already a file, bytes are appended after its current end.
    pub fn open_with(&mut self, path: impl AsRef<Path>, codec: CompressionCodec) -> Result<()> {
        let path = path.as_ref();
        if self.is_open() {
            self.close()?;
        }

        let reopen = self.config.append && self.fs.is_file(path);
        let output = if reopen {
            self.fs.append(path)
        } else {
            self.fs.create(path)
        }
        .map_err(|e| self.fail(SinkError::io("open", path, e)))?;

        let mut stream = codec.wrap(output);
        let hook = if reopen {
            self.formatter.after_reopen(&mut stream)
        } else {
            self.formatter.after_create(&mut stream)
        };
        hook.map_err(|e| self.fail(SinkError::io("open", path, e)))?;

        tracing::info!(
            path = %path.display(),
            codec = %codec,
            formatter = %self.formatter.name(),
            append = reopen,
            "writer opened"
        );

        self.stream = Some(stream);
        self.path = Some(path.to_path_buf());
        self.is_finished = false;
        self.counters.record_open();
        Ok(())
    }

    /// Encode one event into the current frame
    ///
    /// Starts a new frame first when the previous one was sealed by `sync`.
    pub fn append(&mut self, event: &Event) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(SinkError::NotOpen);
        };

        let result = (|| {
            if self.is_finished {
                stream.reset_state()?;
                self.is_finished = false;
            }
            self.formatter.write(event, stream)
        })();

        result.map_err(|e| self.fail_io("append", e))
    }

    /// Seal the current frame (once) and make the file durable
    ///
    /// Flush and durable sync of the output happen on every call.
    pub fn sync(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(SinkError::NotOpen);
        };

        let result = (|| {
            if !self.is_finished {
                stream.finish()?;
                self.is_finished = true;
            }
            match stream.output_mut() {
                Some(out) => {
                    out.flush()?;
                    out.sync()
                }
                None => Err(std::io::Error::other("finished stream has no output")),
            }
        })();

        match result {
            Ok(()) => {
                self.counters.record_sync();
                Ok(())
            }
            Err(e) => Err(self.fail_io("sync", e)),
        }
    }

    /// Write any footer, sync, and release the file
    ///
    /// Safe to call when nothing is open, after a failed `open`, or twice.
    /// The writer is closed afterwards even when an error is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }

        let result = self.write_footer().and_then(|()| self.sync());

        let path = self.path.take();
        let released = match self.stream.take() {
            Some(stream) => stream.close(),
            None => Ok(()),
        };
        self.is_finished = false;
        self.counters.record_close();

        result?;
        released.map_err(|e| {
            self.counters.record_error();
            SinkError::io("close", path.clone().unwrap_or_default(), e)
        })?;

        if let Some(closed) = path.as_deref() {
            tracing::info!(path = %closed.display(), "writer closed");
        }
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        let mut footer = Vec::new();
        self.formatter
            .before_close(&mut footer)
            .map_err(|e| self.fail_io("close", e))?;
        if footer.is_empty() {
            return Ok(());
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(SinkError::NotOpen);
        };
        let result = (|| {
            if self.is_finished {
                stream.reset_state()?;
                self.is_finished = false;
            }
            stream.write_all(&footer)
        })();
        result.map_err(|e| self.fail_io("close", e))
    }

    fn fail_io(&self, op: &'static str, e: std::io::Error) -> SinkError {
        let path = self.path.clone().unwrap_or_default();
        self.fail(SinkError::io(op, path, e))
    }

    fn fail(&self, err: SinkError) -> SinkError {
        self.counters.record_error();
        err
    }
}

impl Drop for DurableWriter {
    fn drop(&mut self) {
        if self.is_open()
            && let Err(e) = self.close()
        {
            tracing::warn!(error = %e, "writer close on drop failed");
        }
    }
}

impl fmt::Debug for DurableWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableWriter")
            .field("path", &self.path)
            .field("formatter", &self.formatter.name())
            .field("config", &self.config)
            .field("is_finished", &self.is_finished)
            .finish()
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
