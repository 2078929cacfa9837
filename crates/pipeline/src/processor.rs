//! Channel processor
//!
//! Turns a batch of events into one transaction per destination channel.

use std::fmt;
use std::sync::Arc;

use spool_channel::{Channel, ChannelError, TransactionState};
use spool_protocol::Event;
use spool_routing::{ChannelId, ChannelSelector};

use crate::error::{PipelineError, Result};
use crate::metrics::{OptionalFailureTracker, ProcessorMetrics, ProcessorSnapshot};

/// Source-facing entry point into the channels
///
/// The processor is shared by every thread of a source; it holds no
/// per-call state, and each call opens its own transactions.
pub struct ChannelProcessor {
    selector: Arc<dyn ChannelSelector>,
    metrics: Arc<ProcessorMetrics>,
    optional_failures: OptionalFailureTracker,
}

/// Handle for reading processor metrics after the processor has moved
#[derive(Debug, Clone)]
pub struct ProcessorMetricsHandle {
    metrics: Arc<ProcessorMetrics>,
}

impl ProcessorMetricsHandle {
    pub fn snapshot(&self) -> ProcessorSnapshot {
        self.metrics.snapshot()
    }
}

/// Events grouped by destination, in first-seen channel order
struct Grouped {
    order: Vec<ChannelId>,
    buckets: Vec<Vec<Event>>,
}

impl Grouped {
    fn new(channel_count: usize) -> Self {
        Self {
            order: Vec::new(),
            buckets: vec![Vec::new(); channel_count],
        }
    }

    fn push(&mut self, id: ChannelId, event: &Event) {
        let Some(bucket) = self.buckets.get_mut(id.as_usize()) else {
            return;
        };
        if bucket.is_empty() {
            self.order.push(id);
        }
        bucket.push(event.clone());
    }

    fn drain(&mut self) -> impl Iterator<Item = (ChannelId, Vec<Event>)> + '_ {
        let buckets = &mut self.buckets;
        self.order
            .drain(..)
            .map(move |id| (id, std::mem::take(&mut buckets[id.as_usize()])))
    }
}

impl ChannelProcessor {
    pub fn new(selector: Arc<dyn ChannelSelector>) -> Self {
        Self {
            selector,
            metrics: Arc::new(ProcessorMetrics::new()),
            optional_failures: OptionalFailureTracker::new(),
        }
    }

    /// Selector deciding where events go
    #[inline]
    pub fn selector(&self) -> &Arc<dyn ChannelSelector> {
        &self.selector
    }

    /// Every channel this processor can deliver to
    #[inline]
    pub fn channels(&self) -> &[Channel] {
        self.selector.channels()
    }

    #[inline]
    pub fn metrics(&self) -> &ProcessorMetrics {
        &self.metrics
    }

    /// Get a metrics handle that outlives moves of the processor
    pub fn metrics_handle(&self) -> ProcessorMetricsHandle {
        ProcessorMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Deliver a single event
    ///
    /// Same semantics as [`process_event_batch`](Self::process_event_batch)
    /// with a batch of one.
    pub fn process_event(&self, event: Event) -> Result<()> {
        self.process_event_batch(std::iter::once(event))
    }

    /// Deliver a batch of events
    ///
    /// Each event goes to its required and optional channels. Events are
    /// grouped so every destination channel sees exactly one transaction
    /// holding its events in batch order. Required channels are processed
    /// first, then optional ones.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Delivery`] for the first required channel
    /// that rejects its events. Channels committed before it keep their
    /// events; later channels are not attempted.
    pub fn process_event_batch<I>(&self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = Event>,
    {
        let channel_count = self.selector.channels().len();
        let mut required = Grouped::new(channel_count);
        let mut optional = Grouped::new(channel_count);
        let mut received = 0u64;

        for event in events {
            received += 1;
            let req = self.selector.required_channels(&event);
            let opt = self.selector.optional_channels(&event);
            if req.is_empty() && opt.is_empty() {
                self.metrics.record_unrouted();
                tracing::trace!(selector = self.selector.kind(), "event matched no channel");
                continue;
            }
            for &id in req {
                required.push(id, &event);
            }
            for &id in opt {
                optional.push(id, &event);
            }
        }
        self.metrics.record_received(received);

        for (id, batch) in required.drain() {
            let Some(channel) = self.selector.channel(id) else {
                continue;
            };
            if let Err(e) = self.deliver(channel, batch) {
                self.metrics.record_required_failure();
                tracing::debug!(
                    channel = %channel.name(),
                    error = %e,
                    "required channel rejected batch"
                );
                return Err(PipelineError::delivery(channel.name(), e));
            }
        }

        for (id, batch) in optional.drain() {
            let Some(channel) = self.selector.channel(id) else {
                continue;
            };
            let count = batch.len() as u64;
            if let Err(e) = self.deliver(channel, batch) {
                self.metrics.record_optional_failure();
                tracing::debug!(
                    channel = %channel.name(),
                    error = %e,
                    "optional channel rejected batch"
                );
                self.optional_failures.record_failure(channel.name(), count);
            }
        }

        Ok(())
    }

    /// Put `events` in one transaction and commit, rolling back on failure
    fn deliver(&self, channel: &Channel, events: Vec<Event>) -> std::result::Result<(), ChannelError> {
        let mut tx = channel.transaction();
        let result = tx
            .begin()
            .and_then(|()| events.into_iter().try_for_each(|event| tx.put(event)))
            .and_then(|()| tx.commit());

        if result.is_err()
            && tx.state() == TransactionState::Open
            && let Err(e) = tx.rollback()
        {
            tracing::warn!(channel = %channel.name(), error = %e, "rollback failed");
        }
        tx.close();

        if result.is_ok() {
            self.metrics.record_commit();
        }
        result
    }
}

impl fmt::Debug for ChannelProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelProcessor")
            .field("selector", &self.selector.kind())
            .field("channels", &self.selector.channels().len())
            .finish()
    }
}
