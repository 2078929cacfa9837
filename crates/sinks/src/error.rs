//! Sink error types

use std::io;
use std::path::PathBuf;

use spool_channel::ChannelError;
use thiserror::Error;

/// Result type for writer and sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors raised by durable writers and sinks
///
/// Writers never retry internally; the sink loop decides whether to roll
/// back, back off and reopen.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Filesystem operation failed
    #[error("I/O error on {op} '{path}': {source}")]
    Io {
        /// Operation that failed (open, append, sync, close)
        op: &'static str,
        /// Destination path
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Formatter could not encode an event
    #[error("write failed: {0}")]
    Write(String),

    /// Writer used before `open` or after `close`
    #[error("writer is not open")]
    NotOpen,

    /// Formatter could not be resolved at build time
    #[error(transparent)]
    Formatter(#[from] FormatterError),

    /// Channel transaction failed while draining
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl SinkError {
    /// Create an Io error for `op` on `path`
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Create a Write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

/// Errors resolving a formatter by name
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatterError {
    /// No name given
    #[error("formatter name must not be empty")]
    EmptyName,

    /// Neither a built-in nor a registered formatter
    #[error("unknown formatter '{name}'")]
    Unknown {
        /// Requested name
        name: String,
    },

    /// Factory rejected its options
    #[error("cannot construct formatter '{name}': {message}")]
    Construction {
        /// Requested name
        name: String,
        /// Reason given by the factory
        message: String,
    },

    /// Name already taken by a built-in or an earlier registration
    #[error("formatter '{name}' is already registered")]
    Duplicate {
        /// Conflicting name
        name: String,
    },
}

impl FormatterError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    pub fn construction(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate { name: name.into() }
    }
}
