//! Channel configuration
//!
//! Channels are named; sources and sinks refer to them by name.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Named channel definitions
///
/// # Example
///
/// ```toml
/// [channels.mem]
/// capacity = 1000
/// transaction_capacity = 100
/// keep_alive = "3s"
/// ```
pub type ChannelsConfig = BTreeMap<String, ChannelConfig>;

/// Configuration for a single bounded channel
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelConfig {
    /// Maximum resident events
    /// Default: 100
    pub capacity: usize,

    /// Maximum events staged by one transaction; must not exceed `capacity`
    /// Default: 100
    pub transaction_capacity: usize,

    /// How long a put waits for space and a take waits for an event
    /// ("0s" fails fast)
    /// Default: 3s
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,

    /// Bound on total body bytes resident; absent or 0 means unbounded
    pub byte_capacity: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            transaction_capacity: 100,
            keep_alive: Duration::from_secs(3),
            byte_capacity: None,
        }
    }
}

impl ChannelConfig {
    /// Byte bound to apply, with 0 treated as unbounded
    pub fn effective_byte_capacity(&self) -> Option<u64> {
        self.byte_capacity.filter(|&bytes| bytes > 0)
    }
}
