//! Counter registry
//!
//! The registry is created once by the embedding process and passed to each
//! component constructor. Asking for the same name twice returns the same
//! counters, so a component rebuilt on reconfiguration keeps its history.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    ChannelCounters, ChannelCountersSnapshot, SinkCounters, SinkCountersSnapshot, SourceCounters,
    SourceCountersSnapshot,
};

#[derive(Debug, Default)]
struct Groups {
    channels: BTreeMap<String, Arc<ChannelCounters>>,
    sources: BTreeMap<String, Arc<SourceCounters>>,
    sinks: BTreeMap<String, Arc<SinkCounters>>,
}

/// Registry of component counters, keyed by component name
///
/// Cloning the registry is cheap and shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    groups: Arc<Mutex<Groups>>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for the named channel (created on first use)
    pub fn channel(&self, name: &str) -> Arc<ChannelCounters> {
        let mut groups = self.groups.lock();
        Arc::clone(groups.channels.entry(name.to_string()).or_default())
    }

    /// Counters for the named source (created on first use)
    pub fn source(&self, name: &str) -> Arc<SourceCounters> {
        let mut groups = self.groups.lock();
        Arc::clone(groups.sources.entry(name.to_string()).or_default())
    }

    /// Counters for the named sink (created on first use)
    pub fn sink(&self, name: &str) -> Arc<SinkCounters> {
        let mut groups = self.groups.lock();
        Arc::clone(groups.sinks.entry(name.to_string()).or_default())
    }

    /// Snapshot every registered component
    pub fn snapshot(&self) -> RegistrySnapshot {
        let groups = self.groups.lock();
        RegistrySnapshot {
            channels: groups
                .channels
                .iter()
                .map(|(k, v)| (k.clone(), v.snapshot()))
                .collect(),
            sources: groups
                .sources
                .iter()
                .map(|(k, v)| (k.clone(), v.snapshot()))
                .collect(),
            sinks: groups
                .sinks
                .iter()
                .map(|(k, v)| (k.clone(), v.snapshot()))
                .collect(),
        }
    }
}

/// Point-in-time copy of every counter in a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySnapshot {
    pub channels: BTreeMap<String, ChannelCountersSnapshot>,
    pub sources: BTreeMap<String, SourceCountersSnapshot>,
    pub sinks: BTreeMap<String, SinkCountersSnapshot>,
}

impl RegistrySnapshot {
    /// Render the snapshot as a single-line JSON document
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
