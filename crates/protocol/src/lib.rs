//! Spool Protocol - Core types that flow through the agent
//!
//! This crate provides the foundational types shared by every component:
//! - `Event` - Immutable unit of data: a byte body plus string headers
//! - `EventBuilder` - Incremental construction of events
//! - `Status` - `OK`/`FAILED` reply handed back to inbound collaborators
//!
//! # Design Principles
//!
//! - **Cheap fan-out**: Bodies are `bytes::Bytes`, so replicating an event
//!   to several channels clones a reference count, not the payload
//! - **Immutable**: Events expose read-only accessors once built
//! - **Single owner**: An event moves source → channel → sink; clones are
//!   only made when a selector replicates it

mod event;
mod status;

pub use event::{Event, EventBuilder, Headers};
pub use status::Status;

// Re-export bytes for convenience
pub use bytes::Bytes;

#[cfg(test)]
mod event_test;
