//! Channel selectors
//!
//! Selectors are compiled once from configuration. Routing an event is a
//! header lookup at most and returns slices into pre-built id lists.

use std::collections::HashMap;
use std::fmt;

use spool_channel::Channel;
use spool_protocol::Event;

use crate::ChannelId;

/// Decides which channels an event is delivered to
///
/// Failure to deliver to a *required* channel fails the event; failure on an
/// *optional* channel is logged and ignored. Implementations must be cheap to
/// query from many source threads at once.
pub trait ChannelSelector: Send + Sync + fmt::Debug {
    /// Channels that must accept the event
    fn required_channels(&self, event: &Event) -> &[ChannelId];

    /// Channels that receive the event on a best-effort basis
    fn optional_channels(&self, event: &Event) -> &[ChannelId];

    /// Every channel this selector can route to, indexed by `ChannelId`
    fn channels(&self) -> &[Channel];

    /// Short selector type name for logs
    fn kind(&self) -> &'static str;

    /// Resolve an id returned by this selector
    #[inline]
    fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels().get(id.as_usize())
    }
}

// =============================================================================
// Replicating
// =============================================================================

/// Sends every event to all configured channels
#[derive(Debug, Clone)]
pub struct ReplicatingSelector {
    channels: Vec<Channel>,
    all: Vec<ChannelId>,
}

impl ReplicatingSelector {
    pub(crate) fn new(channels: Vec<Channel>) -> Self {
        let all = (0..channels.len())
            .map(|i| ChannelId::new(i as u16))
            .collect();
        Self { channels, all }
    }
}

impl ChannelSelector for ReplicatingSelector {
    #[inline]
    fn required_channels(&self, _event: &Event) -> &[ChannelId] {
        &self.all
    }

    #[inline]
    fn optional_channels(&self, _event: &Event) -> &[ChannelId] {
        &[]
    }

    #[inline]
    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn kind(&self) -> &'static str {
        "replicating"
    }
}

// =============================================================================
// Multiplexing
// =============================================================================

/// Routes by the value of one event header
///
/// - header value with a mapping: required = mapped channels
/// - header missing or unmapped: required = default channels
/// - optional channels come from a separate per-value mapping and never
///   repeat a channel already required for that value
#[derive(Debug, Clone)]
pub struct MultiplexingSelector {
    channels: Vec<Channel>,
    header: String,
    required: HashMap<String, Vec<ChannelId>>,
    optional: HashMap<String, Vec<ChannelId>>,
    default: Vec<ChannelId>,
}

impl MultiplexingSelector {
    pub(crate) fn new(
        channels: Vec<Channel>,
        header: String,
        required: HashMap<String, Vec<ChannelId>>,
        optional: HashMap<String, Vec<ChannelId>>,
        default: Vec<ChannelId>,
    ) -> Self {
        Self {
            channels,
            header,
            required,
            optional,
            default,
        }
    }

    /// Header inspected for routing
    #[inline]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Channels used when no mapping matches
    #[inline]
    pub fn default_channels(&self) -> &[ChannelId] {
        &self.default
    }

    /// Number of header values with a required mapping
    #[inline]
    pub fn mapping_count(&self) -> usize {
        self.required.len()
    }
}

impl ChannelSelector for MultiplexingSelector {
    fn required_channels(&self, event: &Event) -> &[ChannelId] {
        event
            .header(&self.header)
            .and_then(|value| self.required.get(value))
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }

    fn optional_channels(&self, event: &Event) -> &[ChannelId] {
        event
            .header(&self.header)
            .and_then(|value| self.optional.get(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[inline]
    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn kind(&self) -> &'static str {
        "multiplexing"
    }
}
