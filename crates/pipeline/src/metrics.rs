//! Channel processor metrics
//!
//! Atomic counters for tracking delivery outcomes.
//! All operations use relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a channel processor
///
/// Counters are eventually consistent; values may be slightly stale when
/// read from another thread.
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    /// Calls to `process_event` / `process_event_batch`
    batches_received: AtomicU64,

    /// Events handed to the processor
    events_received: AtomicU64,

    /// Events with neither required nor optional channels
    events_unrouted: AtomicU64,

    /// Per-channel transactions that committed
    channel_commits: AtomicU64,

    /// Required-channel transactions that failed (batch rejected)
    required_failures: AtomicU64,

    /// Optional-channel transactions that failed (ignored)
    optional_failures: AtomicU64,
}

impl ProcessorMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            events_received: AtomicU64::new(0),
            events_unrouted: AtomicU64::new(0),
            channel_commits: AtomicU64::new(0),
            required_failures: AtomicU64::new(0),
            optional_failures: AtomicU64::new(0),
        }
    }

    /// Record a batch entering the processor
    #[inline]
    pub fn record_received(&self, events: u64) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.events_received.fetch_add(events, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unrouted(&self) {
        self.events_unrouted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_commit(&self) {
        self.channel_commits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_required_failure(&self) {
        self.required_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_optional_failure(&self) {
        self.optional_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_unrouted: self.events_unrouted.load(Ordering::Relaxed),
            channel_commits: self.channel_commits.load(Ordering::Relaxed),
            required_failures: self.required_failures.load(Ordering::Relaxed),
            optional_failures: self.optional_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of processor metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorSnapshot {
    pub batches_received: u64,
    pub events_received: u64,
    pub events_unrouted: u64,
    pub channel_commits: u64,
    pub required_failures: u64,
    pub optional_failures: u64,
}

impl ProcessorSnapshot {
    /// Committed channel transactions over commits plus required failures
    ///
    /// Returns None before any delivery was attempted.
    #[inline]
    pub fn delivery_success_rate(&self) -> Option<f64> {
        let total = self.channel_commits + self.required_failures;
        if total == 0 {
            None
        } else {
            Some(self.channel_commits as f64 / total as f64)
        }
    }
}

// ============================================================================
// Optional failure tracker - rate-limited logging
// ============================================================================

/// Rate-limited logging of optional-channel failures
///
/// Optional channels are best effort, so a full optional channel can fail on
/// every event. The first failure is logged at once; later ones are
/// aggregated and summarised by the first failure after the one-second
/// interval. Anything still pending is summarised when the tracker drops.
#[derive(Debug)]
pub struct OptionalFailureTracker {
    /// Failures in current interval
    interval_failures: AtomicU64,
    /// Events lost in current interval
    interval_events: AtomicU64,
    /// Last log time (epoch milliseconds, 0 = never logged)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;

impl OptionalFailureTracker {
    pub fn new() -> Self {
        Self {
            interval_failures: AtomicU64::new(0),
            interval_events: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(0),
        }
    }

    /// Record a failed optional delivery of `events` events
    ///
    /// Returns true if a summary line was emitted.
    pub fn record_failure(&self, channel: &str, events: u64) -> bool {
        self.interval_failures.fetch_add(1, Ordering::Relaxed);
        self.interval_events.fetch_add(events, Ordering::Relaxed);

        self.maybe_log(channel)
    }

    fn maybe_log(&self, channel: &str) -> bool {
        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // Claim the log slot so concurrent callers do not log twice
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let failures = self.interval_failures.swap(0, Ordering::Relaxed);
        let events = self.interval_events.swap(0, Ordering::Relaxed);
        if failures == 0 {
            return false;
        }

        tracing::warn!(
            last_channel = %channel,
            failures,
            events,
            "optional channel deliveries failed in last second"
        );
        true
    }

    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Failures not yet summarised
    pub fn pending_failures(&self) -> u64 {
        self.interval_failures.load(Ordering::Relaxed)
    }
}

impl Drop for OptionalFailureTracker {
    fn drop(&mut self) {
        let failures = *self.interval_failures.get_mut();
        if failures > 0 {
            tracing::warn!(
                failures,
                events = *self.interval_events.get_mut(),
                "optional channel deliveries failed since last summary"
            );
        }
    }
}

impl Default for OptionalFailureTracker {
    fn default() -> Self {
        Self::new()
    }
}
