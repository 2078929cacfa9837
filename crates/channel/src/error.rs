//! Channel error types

use thiserror::Error;

use crate::TransactionState;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors raised by channels and their transactions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel has no free slot for another event
    #[error("channel '{channel}' is full (capacity {capacity})")]
    Full {
        /// Channel name
        channel: String,
        /// Configured event capacity
        capacity: usize,
    },

    /// Accepting the event would exceed the channel's byte capacity
    #[error("channel '{channel}' byte capacity exceeded ({requested} bytes requested, {remaining} remaining)")]
    ByteCapacityExceeded {
        /// Channel name
        channel: String,
        /// Body bytes of the rejected event
        requested: u64,
        /// Bytes still available
        remaining: u64,
    },

    /// The transaction already staged `capacity` puts (or takes)
    #[error("transaction on channel '{channel}' is full (transaction capacity {capacity})")]
    TransactionFull {
        /// Channel name
        channel: String,
        /// Configured transaction capacity
        capacity: usize,
    },

    /// Operation invoked in the wrong transaction state
    #[error("cannot {op} a transaction in state {state}")]
    InvalidState {
        /// Operation attempted
        op: &'static str,
        /// State the transaction was in
        state: TransactionState,
    },

    /// Channel limits are unusable
    #[error("channel '{channel}' has invalid configuration: {message}")]
    InvalidConfig {
        /// Channel name
        channel: String,
        /// What is wrong
        message: String,
    },
}

impl ChannelError {
    /// Create a Full error
    #[inline]
    pub fn full(channel: impl Into<String>, capacity: usize) -> Self {
        Self::Full {
            channel: channel.into(),
            capacity,
        }
    }

    /// Create a ByteCapacityExceeded error
    #[inline]
    pub fn byte_capacity(channel: impl Into<String>, requested: u64, remaining: u64) -> Self {
        Self::ByteCapacityExceeded {
            channel: channel.into(),
            requested,
            remaining,
        }
    }

    /// Create a TransactionFull error
    #[inline]
    pub fn transaction_full(channel: impl Into<String>, capacity: usize) -> Self {
        Self::TransactionFull {
            channel: channel.into(),
            capacity,
        }
    }

    /// Create an InvalidState error
    #[inline]
    pub fn invalid_state(op: &'static str, state: TransactionState) -> Self {
        Self::InvalidState { op, state }
    }

    /// Create an InvalidConfig error
    #[inline]
    pub fn invalid_config(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Capacity errors: the caller should roll back and retry later.
    ///
    /// State and configuration errors are programming mistakes and are not
    /// worth retrying.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Full { .. } | Self::ByteCapacityExceeded { .. } | Self::TransactionFull { .. }
        )
    }
}
