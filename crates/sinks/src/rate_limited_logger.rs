//! Rate-limited error logging
//!
//! A sink that cannot write (disk full, permissions) fails on every batch.
//! This logs the first failure immediately and then at most once per
//! interval, with the number of failures suppressed in between.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between log lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most one error line per interval for one component
pub struct RateLimitedLogger {
    component: String,
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,
    /// Errors since the last emitted line
    pending: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(component: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            component: component.into(),
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record an error; returns true if a line was emitted
    pub fn error(&self, message: &str, error: &dyn fmt::Display) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.claim_slot() {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 1 {
            tracing::error!(
                component = %self.component,
                error = %error,
                suppressed = count - 1,
                total_errors = total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::error!(
                component = %self.component,
                error = %error,
                total_errors = total,
                "{message}"
            );
        }
        true
    }

    fn claim_slot(&self) -> bool {
        let mut last = self.last_log_time.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Errors recorded since the last emitted line
    pub fn pending_error_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_error_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for RateLimitedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedLogger")
            .field("component", &self.component)
            .field("min_interval", &self.min_interval)
            .field("total", &self.total_error_count())
            .finish()
    }
}
