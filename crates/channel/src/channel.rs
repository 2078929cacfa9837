//! Bounded transactional queue
//!
//! All queue and counter mutation happens under one `parking_lot::Mutex`.
//! Transactions only take the lock to reserve a slot, pop an event, or apply
//! their staged operations in a single commit.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use spool_metrics::ChannelCounters;
use spool_protocol::Event;

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::transaction::Transaction;

/// Handle to a bounded, thread-safe event channel
///
/// Cloning a `Channel` is cheap; clones refer to the same queue. Every
/// operation goes through a [`Transaction`] obtained from
/// [`Channel::transaction`].
///
/// # Occupancy
///
/// A slot is counted from the moment a put reserves it until a take that
/// removed it commits. Events taken by an open transaction are invisible to
/// other takers but still occupy their slot, so a rollback can always put
/// them back.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    transaction_capacity: usize,
    keep_alive: Duration,
    state: Mutex<QueueState>,
    /// Signalled when events become available to take
    not_empty: Condvar,
    /// Signalled when slots or bytes are released
    not_full: Condvar,
    counters: Arc<ChannelCounters>,
}

struct QueueState {
    /// Committed events not taken by any open transaction, oldest first
    queue: VecDeque<Event>,
    capacity: usize,
    byte_capacity: Option<u64>,
    /// Events removed from `queue` by open transactions
    in_flight_takes: usize,
    /// Slots reserved by uncommitted puts
    reserved_puts: usize,
    /// Body bytes of queued, in-flight and reserved events
    bytes_used: u64,
    /// Set by `interrupt_takers`; takes on an empty queue return at once
    takers_interrupted: bool,
}

impl QueueState {
    #[inline]
    fn resident(&self) -> usize {
        self.queue.len() + self.in_flight_takes
    }

    #[inline]
    fn occupied(&self) -> usize {
        self.resident() + self.reserved_puts
    }

    /// Reserve a slot and `bytes` for a put, or explain why not
    ///
    /// `credit` is the number of slots the putting transaction's own
    /// uncommitted takes will release when it commits.
    fn admit(&mut self, channel: &str, bytes: u64, credit: usize) -> Result<()> {
        if self.occupied() >= self.capacity + credit {
            return Err(ChannelError::full(channel, self.capacity));
        }
        if let Some(limit) = self.byte_capacity
            && self.bytes_used + bytes > limit
        {
            return Err(ChannelError::byte_capacity(
                channel,
                bytes,
                limit.saturating_sub(self.bytes_used),
            ));
        }
        self.reserved_puts += 1;
        self.bytes_used += bytes;
        Ok(())
    }
}

impl Channel {
    /// Create a channel with its own counters
    pub fn new(name: impl Into<String>, config: ChannelConfig) -> Result<Self> {
        Self::with_counters(name, config, Arc::new(ChannelCounters::new()))
    }

    /// Create a channel that reports into injected counters
    pub fn with_counters(
        name: impl Into<String>,
        config: ChannelConfig,
        counters: Arc<ChannelCounters>,
    ) -> Result<Self> {
        let name = name.into();
        config.validate(&name)?;

        tracing::debug!(
            channel = %name,
            capacity = config.capacity,
            transaction_capacity = config.transaction_capacity,
            keep_alive_ms = config.keep_alive.as_millis() as u64,
            byte_capacity = ?config.byte_capacity,
            "channel created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                transaction_capacity: config.transaction_capacity,
                keep_alive: config.keep_alive,
                state: Mutex::new(QueueState {
                    queue: VecDeque::with_capacity(config.capacity),
                    capacity: config.capacity,
                    byte_capacity: config.byte_capacity,
                    in_flight_takes: 0,
                    reserved_puts: 0,
                    bytes_used: 0,
                    takers_interrupted: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                counters,
            }),
        })
    }

    /// Start a new transaction against this channel
    ///
    /// Transactions are cheap. Each thread should use its own; a closed
    /// transaction may be begun again.
    #[inline]
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Channel name
    #[inline]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current event capacity
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().capacity
    }

    /// Maximum staged puts (or takes) per transaction
    #[inline]
    pub fn transaction_capacity(&self) -> usize {
        self.shared.transaction_capacity
    }

    /// Keep-alive used by blocking puts and takes
    #[inline]
    pub fn keep_alive(&self) -> Duration {
        self.shared.keep_alive
    }

    /// Current limits as a config value
    pub fn config(&self) -> ChannelConfig {
        let state = self.shared.state.lock();
        ChannelConfig {
            capacity: state.capacity,
            transaction_capacity: self.shared.transaction_capacity,
            keep_alive: self.shared.keep_alive,
            byte_capacity: state.byte_capacity,
        }
    }

    /// Committed events not yet consumed (including ones taken by open
    /// transactions)
    pub fn len(&self) -> usize {
        self.shared.state.lock().resident()
    }

    /// Whether no committed events are resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots neither committed nor reserved
    pub fn remaining_capacity(&self) -> usize {
        let state = self.shared.state.lock();
        state.capacity.saturating_sub(state.occupied())
    }

    /// Body bytes of resident and reserved events
    pub fn bytes_used(&self) -> u64 {
        self.shared.state.lock().bytes_used
    }

    /// Counters this channel reports into
    #[inline]
    pub fn counters(&self) -> &Arc<ChannelCounters> {
        &self.shared.counters
    }

    /// Change the event capacity
    ///
    /// The channel cannot shrink below the number of resident events.
    /// Puts already reserved stay reserved; a commit that would then exceed
    /// the new capacity fails with [`ChannelError::Full`].
    pub fn resize(&self, capacity: usize) -> Result<()> {
        if capacity == 0 || capacity < self.shared.transaction_capacity {
            return Err(ChannelError::invalid_config(
                self.name(),
                format!(
                    "capacity {} must be > 0 and >= transaction_capacity ({})",
                    capacity, self.shared.transaction_capacity
                ),
            ));
        }

        let mut state = self.shared.state.lock();
        let resident = state.resident();
        if capacity < resident {
            return Err(ChannelError::invalid_config(
                self.name(),
                format!("cannot shrink to {capacity}, {resident} events resident"),
            ));
        }
        let previous = std::mem::replace(&mut state.capacity, capacity);
        drop(state);

        tracing::info!(channel = %self.name(), previous, capacity, "channel resized");
        self.shared.not_full.notify_all();
        Ok(())
    }

    /// Wake every blocked take; they return "nothing available"
    ///
    /// The interruption stays in effect until [`resume_takers`](Self::resume_takers):
    /// takes still return queued events, but never wait on an empty queue.
    /// Used by sink shutdown so a drain loop does not sit out the keep-alive.
    pub fn interrupt_takers(&self) {
        self.shared.state.lock().takers_interrupted = true;
        self.shared.not_empty.notify_all();
    }

    /// Let takes wait out the keep-alive again after `interrupt_takers`
    pub fn resume_takers(&self) {
        self.shared.state.lock().takers_interrupted = false;
    }

    /// Whether `interrupt_takers` is in effect
    pub fn takers_interrupted(&self) -> bool {
        self.shared.state.lock().takers_interrupted
    }

    // ------------------------------------------------------------------
    // Transaction hooks
    // ------------------------------------------------------------------

    /// Reserve a slot for a staged put, waiting up to the keep-alive
    pub(crate) fn reserve_put(&self, bytes: u64, credit: usize) -> Result<()> {
        let shared = &self.shared;
        let deadline = Instant::now() + shared.keep_alive;
        let mut state = shared.state.lock();

        loop {
            let err = match state.admit(&shared.name, bytes, credit) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            // An event larger than the whole byte capacity never fits
            let hopeless = state.byte_capacity.is_some_and(|limit| bytes > limit);
            if hopeless || shared.keep_alive.is_zero() || Instant::now() >= deadline {
                return Err(err);
            }
            shared.not_full.wait_until(&mut state, deadline);
        }
    }

    /// Pop the oldest available event, waiting up to the keep-alive
    pub(crate) fn take_one(&self) -> Option<Event> {
        let shared = &self.shared;
        let deadline = Instant::now() + shared.keep_alive;
        let mut state = shared.state.lock();

        loop {
            if let Some(event) = state.queue.pop_front() {
                state.in_flight_takes += 1;
                return Some(event);
            }
            if shared.keep_alive.is_zero()
                || state.takers_interrupted
                || Instant::now() >= deadline
            {
                return None;
            }
            shared.not_empty.wait_until(&mut state, deadline);
        }
    }

    /// Apply staged puts and takes in one critical section
    ///
    /// On success both vectors are emptied. On failure nothing changes and
    /// the caller must roll back.
    pub(crate) fn apply_commit(&self, puts: &mut Vec<Event>, takes: &mut Vec<Event>) -> Result<()> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        let resident_after = state.resident() - takes.len() + puts.len();
        if resident_after > state.capacity {
            return Err(ChannelError::full(&shared.name, state.capacity));
        }

        let put_count = puts.len();
        let take_count = takes.len();
        let taken_bytes: u64 = takes.iter().map(|e| e.body_len() as u64).sum();

        state.reserved_puts -= put_count;
        state.in_flight_takes -= take_count;
        state.bytes_used -= taken_bytes;
        state.queue.extend(puts.drain(..));
        takes.clear();

        let size = state.resident() as u64;
        drop(state);

        // A commit with nothing staged is not counted
        if put_count > 0 || take_count > 0 {
            shared
                .counters
                .record_commit(put_count as u64, take_count as u64, size);
        }
        if put_count > 0 {
            shared.not_empty.notify_all();
        }
        if take_count > 0 {
            shared.not_full.notify_all();
        }
        Ok(())
    }

    /// Release reservations and return taken events to the head of the queue
    pub(crate) fn apply_rollback(&self, puts: &mut Vec<Event>, put_bytes: u64, takes: &mut Vec<Event>) {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        let released = puts.len();
        let returned = takes.len();

        state.reserved_puts -= released;
        state.bytes_used -= put_bytes;
        puts.clear();

        state.in_flight_takes -= returned;
        for event in takes.drain(..).rev() {
            state.queue.push_front(event);
        }

        let size = state.resident() as u64;
        drop(state);

        shared.counters.record_rollback(size);
        if released > 0 {
            shared.not_full.notify_all();
        }
        if returned > 0 {
            shared.not_empty.notify_all();
        }
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Channel {}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Channel")
            .field("name", &self.shared.name)
            .field("capacity", &state.capacity)
            .field("resident", &state.resident())
            .field("reserved", &state.reserved_puts)
            .finish()
    }
}
