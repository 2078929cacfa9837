//! Spool - Metrics
//!
//! Counters for channels, sources and sinks, handed out by an injected
//! [`MetricsRegistry`].
//!
//! # Design Principles
//!
//! - **Lock-free updates**: Counters are `AtomicU64` with relaxed ordering
//! - **Injected, not global**: Components receive their counters at
//!   construction; tests pass a fresh registry and read snapshots back
//! - **Transport agnostic**: Only increment points and snapshots live here,
//!   reporting is left to the embedding process
//!
//! # Example
//!
//! ```
//! use spool_metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new();
//! let counters = registry.channel("mem");
//! counters.record_put_attempt();
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.channels["mem"].put_attempts, 1);
//! ```

mod registry;
mod traits;

pub use registry::{MetricsRegistry, RegistrySnapshot};
pub use traits::{
    ChannelCounters, ChannelCountersSnapshot, SinkCounters, SinkCountersSnapshot, SourceCounters,
    SourceCountersSnapshot,
};
