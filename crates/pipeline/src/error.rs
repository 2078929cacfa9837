//! Pipeline error types

use spool_channel::ChannelError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A required channel did not accept its share of the batch
    ///
    /// Everything staged for that channel was rolled back. Channels committed
    /// before the failure keep their events.
    #[error("delivery to required channel '{channel}' failed: {source}")]
    Delivery {
        /// Channel that failed
        channel: String,
        /// Underlying channel error
        #[source]
        source: ChannelError,
    },
}

impl PipelineError {
    /// Create a Delivery error
    #[inline]
    pub fn delivery(channel: impl Into<String>, source: ChannelError) -> Self {
        Self::Delivery {
            channel: channel.into(),
            source,
        }
    }

    /// Name of the channel that failed
    pub fn channel(&self) -> &str {
        match self {
            Self::Delivery { channel, .. } => channel,
        }
    }

    /// Whether retrying later may succeed (the channel was full)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Delivery { source, .. } => source.is_recoverable(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
