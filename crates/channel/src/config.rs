//! Channel configuration

use std::time::Duration;

use crate::error::{ChannelError, Result};

/// Default maximum number of resident events
pub const DEFAULT_CAPACITY: usize = 100;

/// Default maximum number of staged operations per transaction
pub const DEFAULT_TRANSACTION_CAPACITY: usize = 100;

/// Default wait for a slot (put) or an event (take)
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(3);

/// Limits applied by a [`Channel`](crate::Channel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum events resident in the channel (committed plus reserved)
    pub capacity: usize,

    /// Maximum puts, and separately takes, staged by one transaction
    pub transaction_capacity: usize,

    /// How long a put waits for space and a take waits for an event.
    /// `Duration::ZERO` makes both fail fast.
    pub keep_alive: Duration,

    /// Optional bound on the total body bytes resident in the channel
    pub byte_capacity: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            transaction_capacity: DEFAULT_TRANSACTION_CAPACITY,
            keep_alive: DEFAULT_KEEP_ALIVE,
            byte_capacity: None,
        }
    }
}

impl ChannelConfig {
    /// Set the event capacity
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the per-transaction capacity
    #[must_use]
    pub fn with_transaction_capacity(mut self, transaction_capacity: usize) -> Self {
        self.transaction_capacity = transaction_capacity;
        self
    }

    /// Set the keep-alive used by blocking puts and takes
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Bound the total body bytes resident in the channel
    #[must_use]
    pub fn with_byte_capacity(mut self, bytes: u64) -> Self {
        self.byte_capacity = Some(bytes);
        self
    }

    /// Fail fast instead of waiting on full/empty channels
    #[must_use]
    pub fn fail_fast(self) -> Self {
        self.with_keep_alive(Duration::ZERO)
    }

    /// Check the limits are usable
    pub fn validate(&self, channel: &str) -> Result<()> {
        if self.capacity == 0 {
            return Err(ChannelError::invalid_config(channel, "capacity must be > 0"));
        }
        if self.transaction_capacity == 0 {
            return Err(ChannelError::invalid_config(
                channel,
                "transaction_capacity must be > 0",
            ));
        }
        if self.transaction_capacity > self.capacity {
            return Err(ChannelError::invalid_config(
                channel,
                format!(
                    "transaction_capacity ({}) must not exceed capacity ({})",
                    self.transaction_capacity, self.capacity
                ),
            ));
        }
        if self.byte_capacity == Some(0) {
            return Err(ChannelError::invalid_config(
                channel,
                "byte_capacity must be > 0 when set",
            ));
        }
        Ok(())
    }
}
