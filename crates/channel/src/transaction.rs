//! Transaction state machine
//!
//! ```text
//!   NEW ──begin──► OPEN ──commit───► COMMITTED ──┐
//!    ▲               │                           ├──close──► CLOSED
//!    │               └──rollback──► ROLLED_BACK ─┘             │
//!    └──────────────────────── begin (reuse) ◄─────────────────┘
//! ```
//!
//! Staged puts and takes live in the transaction until `commit` applies
//! them to the channel in one step or `rollback` discards them.

use std::fmt;

use spool_protocol::Event;

use crate::channel::Channel;
use crate::error::{ChannelError, Result};

/// Lifecycle state of a [`Transaction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Created, not yet begun
    New,
    /// Accepting puts and takes
    Open,
    /// Staged operations applied
    Committed,
    /// Staged operations discarded
    RolledBack,
    /// Released; may be begun again
    Closed,
}

impl TransactionState {
    /// Upper-case name used in error messages
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Open => "OPEN",
            Self::Committed => "COMMITTED",
            Self::RolledBack => "ROLLED_BACK",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of puts and takes against one channel
///
/// Owned by a single thread. Dropping the transaction closes it, so
/// reservations are released on every exit path, including `?` and panics.
///
/// # Example
///
/// ```
/// use spool_channel::{Channel, ChannelConfig};
/// use spool_protocol::Event;
///
/// let channel = Channel::new(
///     "mem",
///     ChannelConfig::default()
///         .with_capacity(2)
///         .with_transaction_capacity(2),
/// )?;
/// let mut tx = channel.transaction();
/// tx.begin()?;
/// tx.put(Event::new("a"))?;
/// if tx.put(Event::new("b")).is_err() {
///     tx.rollback()?;
/// } else {
///     tx.commit()?;
/// }
/// tx.close();
/// assert_eq!(channel.len(), 2);
/// # Ok::<(), spool_channel::ChannelError>(())
/// ```
pub struct Transaction {
    channel: Channel,
    state: TransactionState,
    puts: Vec<Event>,
    put_bytes: u64,
    takes: Vec<Event>,
}

impl Transaction {
    pub(crate) fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: TransactionState::New,
            puts: Vec::new(),
            put_bytes: 0,
            takes: Vec::new(),
        }
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Channel this transaction operates on
    #[inline]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Number of staged puts
    #[inline]
    pub fn pending_puts(&self) -> usize {
        self.puts.len()
    }

    /// Number of staged takes
    #[inline]
    pub fn pending_takes(&self) -> usize {
        self.takes.len()
    }

    /// Move from `NEW` (or `CLOSED`, for reuse) to `OPEN`
    pub fn begin(&mut self) -> Result<()> {
        match self.state {
            TransactionState::New | TransactionState::Closed => {
                self.state = TransactionState::Open;
                Ok(())
            }
            state => Err(ChannelError::invalid_state("begin", state)),
        }
    }

    /// Stage an event for insertion
    ///
    /// Reserves a slot in the channel, waiting up to the channel keep-alive.
    /// Fails with [`ChannelError::Full`] or
    /// [`ChannelError::ByteCapacityExceeded`] when no slot frees up, and with
    /// [`ChannelError::TransactionFull`] once `transaction_capacity` puts are
    /// staged. The transaction stays `OPEN` so the caller can roll back.
    pub fn put(&mut self, event: Event) -> Result<()> {
        self.ensure_open("put")?;
        self.channel.counters().record_put_attempt();

        if self.puts.len() >= self.channel.transaction_capacity() {
            return Err(ChannelError::transaction_full(
                self.channel.name(),
                self.channel.transaction_capacity(),
            ));
        }

        let bytes = event.body_len() as u64;
        // Slots this transaction frees on commit may be refilled by its own puts
        let credit = self.takes.len().saturating_sub(self.puts.len());
        self.channel.reserve_put(bytes, credit)?;
        self.put_bytes += bytes;
        self.puts.push(event);
        Ok(())
    }

    /// Take the oldest available event
    ///
    /// Returns `Ok(None)` when nothing arrives within the keep-alive, or at
    /// once while [`Channel::interrupt_takers`] is in effect. The event stays reserved for
    /// this transaction until commit (removed) or rollback (returned).
    pub fn take(&mut self) -> Result<Option<Event>> {
        self.ensure_open("take")?;
        self.channel.counters().record_take_attempt();

        if self.takes.len() >= self.channel.transaction_capacity() {
            return Err(ChannelError::transaction_full(
                self.channel.name(),
                self.channel.transaction_capacity(),
            ));
        }

        let event = self.channel.take_one();
        if let Some(ref event) = event {
            self.takes.push(event.clone());
        }
        Ok(event)
    }

    /// Apply every staged put and take atomically
    ///
    /// If the channel cannot hold the result the transaction stays `OPEN`
    /// with nothing applied; call [`rollback`](Self::rollback).
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open("commit")?;
        self.channel.apply_commit(&mut self.puts, &mut self.takes)?;
        self.put_bytes = 0;
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Discard every staged put and take
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open("rollback")?;
        self.release();
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    /// Release the transaction
    ///
    /// Idempotent. Closing an `OPEN` transaction rolls it back first.
    pub fn close(&mut self) {
        match self.state {
            TransactionState::Closed => {}
            TransactionState::Open => {
                tracing::warn!(
                    channel = %self.channel.name(),
                    pending_puts = self.puts.len(),
                    pending_takes = self.takes.len(),
                    "transaction closed while open, rolling back"
                );
                self.release();
                self.state = TransactionState::Closed;
            }
            _ => self.state = TransactionState::Closed,
        }
    }

    fn release(&mut self) {
        self.channel
            .apply_rollback(&mut self.puts, self.put_bytes, &mut self.takes);
        self.put_bytes = 0;
    }

    #[inline]
    fn ensure_open(&self, op: &'static str) -> Result<()> {
        if self.state == TransactionState::Open {
            Ok(())
        } else {
            Err(ChannelError::invalid_state(op, self.state))
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("channel", &self.channel.name())
            .field("state", &self.state)
            .field("pending_puts", &self.puts.len())
            .field("pending_takes", &self.takes.len())
            .finish()
    }
}
