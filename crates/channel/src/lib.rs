//! Spool - Channels
//!
//! Bounded, thread-safe event stores with transactional put/take.
//!
//! # Architecture
//!
//! ```text
//! [Source thread]                                   [Sink thread]
//!   tx.begin()                                        tx.begin()
//!   tx.put(e1) ─┐                                ┌─→  tx.take() → e1
//!   tx.put(e2) ─┤ staged in the transaction      │    tx.take() → e2
//!   tx.commit() ┴──→ [Channel queue] ────────────┘    tx.commit()
//!                     (one lock, one critical section per commit)
//! ```
//!
//! # Key Design
//!
//! - **Staged batches**: puts and takes accumulate in the transaction and
//!   become visible to other threads in a single commit
//! - **Reserved capacity**: a put reserves a slot (and body bytes when a byte
//!   capacity is set) so committed events never exceed `capacity`
//! - **Scoped cleanup**: dropping a `Transaction` closes it, releasing any
//!   reservation and returning taken events on every exit path
//! - **Keep-alive**: blocked puts and takes give up after `keep_alive`;
//!   a zero keep-alive makes both fail fast
//!
//! # Example
//!
//! ```
//! use spool_channel::{Channel, ChannelConfig};
//! use spool_protocol::Event;
//!
//! let channel = Channel::new("mem", ChannelConfig::default())?;
//!
//! let mut tx = channel.transaction();
//! tx.begin()?;
//! tx.put(Event::new("hello"))?;
//! tx.commit()?;
//! tx.close();
//!
//! let mut tx = channel.transaction();
//! tx.begin()?;
//! let event = tx.take()?.expect("event was committed");
//! tx.commit()?;
//! assert_eq!(event.body().as_ref(), b"hello");
//! # Ok::<(), spool_channel::ChannelError>(())
//! ```

mod channel;
mod config;
mod error;
mod transaction;

pub use channel::Channel;
pub use config::{
    ChannelConfig, DEFAULT_CAPACITY, DEFAULT_KEEP_ALIVE, DEFAULT_TRANSACTION_CAPACITY,
};
pub use error::{ChannelError, Result};
pub use transaction::{Transaction, TransactionState};

#[cfg(test)]
mod channel_test;
