//! Embedded request/response source
//!
//! `RpcSource` is the handler half of an RPC server: the transport (not part
//! of this crate) decodes requests into events and calls [`RpcSource::append`]
//! or [`RpcSource::append_batch`], sending the returned [`Status`] back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spool_metrics::SourceCounters;
use spool_pipeline::ChannelProcessor;
use spool_protocol::{Event, Status};

/// Request handler delivering events through a [`ChannelProcessor`]
pub struct RpcSource {
    name: String,
    processor: ChannelProcessor,
    counters: Arc<SourceCounters>,
    running: Arc<AtomicBool>,
}

impl RpcSource {
    /// Create a running source
    pub fn new(
        name: impl Into<String>,
        processor: ChannelProcessor,
        counters: Arc<SourceCounters>,
    ) -> Self {
        Self {
            name: name.into(),
            processor,
            counters,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn processor(&self) -> &ChannelProcessor {
        &self.processor
    }

    #[inline]
    pub fn counters(&self) -> &Arc<SourceCounters> {
        &self.counters
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop accepting requests
    ///
    /// Later calls answer `FAILED` without touching any channel.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::Relaxed) {
            tracing::info!(source = %self.name, counters = ?self.counters.snapshot(), "rpc source stopped");
        }
    }

    /// Deliver one event
    pub fn append(&self, event: Event) -> Status {
        tracing::trace!(source = %self.name, body_len = event.body_len(), "append");
        self.counters.record_received(1);
        self.deliver(|processor| processor.process_event(event))
    }

    /// Deliver a batch of events
    ///
    /// `OK` means every required channel committed the whole batch.
    pub fn append_batch(&self, events: Vec<Event>) -> Status {
        tracing::trace!(source = %self.name, events = events.len(), "append batch");
        self.counters.record_received(events.len() as u64);
        self.deliver(|processor| processor.process_event_batch(events))
    }

    fn deliver<F>(&self, f: F) -> Status
    where
        F: FnOnce(&ChannelProcessor) -> spool_pipeline::Result<()>,
    {
        if !self.is_running() {
            self.counters.record_rejected();
            return Status::Failed;
        }

        match f(&self.processor) {
            Ok(()) => {
                self.counters.record_accepted();
                Status::Ok
            }
            Err(e) => {
                tracing::debug!(source = %self.name, error = %e, "append rejected");
                self.counters.record_rejected();
                Status::Failed
            }
        }
    }
}

impl std::fmt::Debug for RpcSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSource")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod rpc_test;
