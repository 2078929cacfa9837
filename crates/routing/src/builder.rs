//! Selector builders
//!
//! Channels are registered once and referred to by name afterwards; every
//! name is resolved to a [`ChannelId`] before the selector is returned.

use std::collections::HashMap;

use spool_channel::Channel;

use crate::error::{Result, RoutingError};
use crate::selector::{MultiplexingSelector, ReplicatingSelector};
use crate::ChannelId;

/// Registers channels and builds a selector over them
#[derive(Debug, Default)]
pub struct SelectorBuilder {
    /// Registered channels: name → id
    channel_ids: HashMap<String, ChannelId>,

    /// Channels in id order
    channels: Vec<Channel>,
}

impl SelectorBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel and get its ID
    ///
    /// Registering a second channel under an existing name returns the
    /// existing ID and keeps the first channel.
    pub fn register_channel(&mut self, channel: Channel) -> ChannelId {
        if let Some(&id) = self.channel_ids.get(channel.name()) {
            return id;
        }

        let id = ChannelId::new(self.channels.len() as u16);
        self.channel_ids.insert(channel.name().to_owned(), id);
        self.channels.push(channel);
        id
    }

    /// Get the ID of a registered channel
    #[inline]
    pub fn channel_id(&self, name: &str) -> Option<ChannelId> {
        self.channel_ids.get(name).copied()
    }

    /// Number of registered channels
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Build a selector that sends every event to every registered channel
    pub fn replicating(self) -> Result<ReplicatingSelector> {
        self.check_channels()?;
        Ok(ReplicatingSelector::new(self.channels))
    }

    /// Start a selector that routes on `header`
    pub fn multiplexing(self, header: impl Into<String>) -> MultiplexingBuilder {
        MultiplexingBuilder {
            base: self,
            header: header.into(),
            required: Vec::new(),
            optional: Vec::new(),
            default: Vec::new(),
        }
    }

    fn check_channels(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(RoutingError::NoChannels);
        }
        if self.channels.len() > usize::from(ChannelId::MAX) {
            return Err(RoutingError::TooManyChannels {
                max: usize::from(ChannelId::MAX),
            });
        }
        Ok(())
    }

    /// Resolve names to ids, dropping repeats but keeping first-seen order
    fn resolve(&self, names: &[String]) -> Result<Vec<ChannelId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self
                .channel_id(name)
                .ok_or_else(|| RoutingError::unknown_channel(name))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Collects header-value mappings for a [`MultiplexingSelector`]
#[derive(Debug)]
pub struct MultiplexingBuilder {
    base: SelectorBuilder,
    header: String,
    required: Vec<(String, Vec<String>)>,
    optional: Vec<(String, Vec<String>)>,
    default: Vec<String>,
}

impl MultiplexingBuilder {
    /// Required channels for events whose header equals `value`
    #[must_use]
    pub fn map<I, S>(mut self, value: impl Into<String>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .push((value.into(), channels.into_iter().map(Into::into).collect()));
        self
    }

    /// Optional channels for events whose header equals `value`
    #[must_use]
    pub fn optional<I, S>(mut self, value: impl Into<String>, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional
            .push((value.into(), channels.into_iter().map(Into::into).collect()));
        self
    }

    /// Required channels when the header is missing or unmapped
    #[must_use]
    pub fn default_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve all names and build the selector
    ///
    /// # Errors
    ///
    /// Fails on an empty header name, an unknown channel name, or a header
    /// value mapped twice in the same table.
    pub fn build(self) -> Result<MultiplexingSelector> {
        let Self {
            base,
            header,
            required,
            optional,
            default,
        } = self;

        base.check_channels()?;
        if header.is_empty() {
            return Err(RoutingError::MissingHeader);
        }

        let required = resolve_table(&base, required)?;
        let mut optional = resolve_table(&base, optional)?;
        let default = base.resolve(&default)?;

        for (value, ids) in optional.iter_mut() {
            let already = required.get(value).map(Vec::as_slice).unwrap_or(&default);
            ids.retain(|id| !already.contains(id));
        }
        optional.retain(|_, ids| !ids.is_empty());

        if default.is_empty() {
            tracing::debug!(%header, "multiplexing selector has no default channels");
        }

        Ok(MultiplexingSelector::new(
            base.channels,
            header,
            required,
            optional,
            default,
        ))
    }
}

fn resolve_table(
    base: &SelectorBuilder,
    entries: Vec<(String, Vec<String>)>,
) -> Result<HashMap<String, Vec<ChannelId>>> {
    let mut table = HashMap::with_capacity(entries.len());
    for (value, names) in entries {
        let ids = base.resolve(&names)?;
        if table.insert(value.clone(), ids).is_some() {
            return Err(RoutingError::duplicate_mapping(value));
        }
    }
    Ok(table)
}
