//! Counter groups for each component kind
//!
//! Each group is a plain struct of atomics with `record_*` increment points
//! and a `snapshot()` returning a serializable copy.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for a channel
///
/// Attempts are counted when a transaction stages an operation, successes
/// when the transaction commits.
#[derive(Debug, Default)]
pub struct ChannelCounters {
    /// Puts staged by transactions
    pub put_attempts: AtomicU64,
    /// Puts applied by a commit
    pub put_success: AtomicU64,
    /// Takes attempted by transactions (including empty takes)
    pub take_attempts: AtomicU64,
    /// Takes applied by a commit
    pub take_success: AtomicU64,
    /// Committed transactions
    pub commits: AtomicU64,
    /// Rolled back transactions
    pub rollbacks: AtomicU64,
    /// Events resident in the channel after the last commit/rollback
    pub size: AtomicU64,
}

impl ChannelCounters {
    /// Create counters with all values at zero
    pub const fn new() -> Self {
        Self {
            put_attempts: AtomicU64::new(0),
            put_success: AtomicU64::new(0),
            take_attempts: AtomicU64::new(0),
            take_success: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            size: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_put_attempt(&self) {
        self.put_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_take_attempt(&self) {
        self.take_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a commit that applied `puts` and `takes`
    #[inline]
    pub fn record_commit(&self, puts: u64, takes: u64, size: u64) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.put_success.fetch_add(puts, Ordering::Relaxed);
        self.take_success.fetch_add(takes, Ordering::Relaxed);
        self.size.store(size, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rollback(&self, size: u64) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
        self.size.store(size, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    pub fn snapshot(&self) -> ChannelCountersSnapshot {
        ChannelCountersSnapshot {
            put_attempts: self.put_attempts.load(Ordering::Relaxed),
            put_success: self.put_success.load(Ordering::Relaxed),
            take_attempts: self.take_attempts.load(Ordering::Relaxed),
            take_success: self.take_success.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of channel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCountersSnapshot {
    pub put_attempts: u64,
    pub put_success: u64,
    pub take_attempts: u64,
    pub take_success: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub size: u64,
}

/// Counters for a source
#[derive(Debug, Default)]
pub struct SourceCounters {
    /// Append requests received from the inbound collaborator
    pub received: AtomicU64,
    /// Events handed to the channel processor
    pub events: AtomicU64,
    /// Requests answered with `OK`
    pub accepted: AtomicU64,
    /// Requests answered with `FAILED`
    pub rejected: AtomicU64,
}

impl SourceCounters {
    /// Create counters with all values at zero
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            events: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self, events: u64) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(events, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    pub fn snapshot(&self) -> SourceCountersSnapshot {
        SourceCountersSnapshot {
            received: self.received.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of source counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCountersSnapshot {
    pub received: u64,
    pub events: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Counters for a sink
#[derive(Debug, Default)]
pub struct SinkCounters {
    /// Transactions that drained at least one event
    pub batches_drained: AtomicU64,
    /// Events appended to the writer
    pub events_written: AtomicU64,
    /// Body bytes appended to the writer (before compression)
    pub bytes_written: AtomicU64,
    /// Writer sync calls
    pub syncs: AtomicU64,
    /// Writer failures (open, append, sync or close)
    pub write_errors: AtomicU64,
    /// Output files opened
    pub files_opened: AtomicU64,
    /// Output files closed
    pub files_closed: AtomicU64,
}

impl SinkCounters {
    /// Create counters with all values at zero
    pub const fn new() -> Self {
        Self {
            batches_drained: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            files_opened: AtomicU64::new(0),
            files_closed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_batch(&self, events: u64, bytes: u64) {
        self.batches_drained.fetch_add(1, Ordering::Relaxed);
        self.events_written.fetch_add(events, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sync(&self) {
        self.syncs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_open(&self) {
        self.files_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_close(&self) {
        self.files_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    pub fn snapshot(&self) -> SinkCountersSnapshot {
        SinkCountersSnapshot {
            batches_drained: self.batches_drained.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            syncs: self.syncs.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            files_opened: self.files_opened.load(Ordering::Relaxed),
            files_closed: self.files_closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkCountersSnapshot {
    pub batches_drained: u64,
    pub events_written: u64,
    pub bytes_written: u64,
    pub syncs: u64,
    pub write_errors: u64,
    pub files_opened: u64,
    pub files_closed: u64,
}
