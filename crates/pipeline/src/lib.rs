//! Spool - Pipeline
//!
//! The source-facing entry point that hands events to channels.
//!
//! # Architecture
//!
//! ```text
//! [Source]                 [ChannelProcessor]                        [Channels]
//!   events ──→ selector.required / optional ──→ group by channel ──┬──→ tx(A): put.. commit
//!                                                                 └──→ tx(B): put.. commit
//! ```
//!
//! # Key Design
//!
//! - **One transaction per channel**: every event bound for a channel is put
//!   in a single transaction, so a batch lands in that channel atomically
//! - **Independent channels**: a failure on one channel never undoes a commit
//!   already made on another; delivery is at-least-once across channels
//! - **Required vs optional**: the first required failure aborts the batch
//!   and is returned; optional failures are logged and counted only
//! - **Scoped transactions**: every transaction is closed on every path
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use spool_channel::{Channel, ChannelConfig};
//! use spool_pipeline::ChannelProcessor;
//! use spool_protocol::Event;
//! use spool_routing::SelectorBuilder;
//!
//! let channel = Channel::new("mem", ChannelConfig::default())?;
//! let mut builder = SelectorBuilder::new();
//! builder.register_channel(channel.clone());
//!
//! let processor = ChannelProcessor::new(Arc::new(builder.replicating()?));
//! processor.process_event(Event::new("hello"))?;
//! assert_eq!(channel.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod metrics;
mod processor;

pub use error::{PipelineError, Result};
pub use metrics::{OptionalFailureTracker, ProcessorMetrics, ProcessorSnapshot};
pub use processor::{ChannelProcessor, ProcessorMetricsHandle};
