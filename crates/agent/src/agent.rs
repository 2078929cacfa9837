//! Component wiring
//!
//! Turns a validated [`Config`] into live channels, sources and sinks. Every
//! component reports into one shared [`MetricsRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use spool_channel::{Channel, ChannelConfig};
use spool_config::{Config, SelectorConfig, SinkConfig, SourceConfig, SourceType};
use spool_metrics::{MetricsRegistry, RegistrySnapshot};
use spool_pipeline::{ChannelProcessor, ProcessorMetricsHandle, ProcessorSnapshot};
use spool_routing::{ChannelSelector, SelectorBuilder};
use spool_sinks::{
    CompressionCodec, FileSystem, FormatterOptions, FormatterRegistry, WriterSink,
    WriterSinkConfig,
};
use spool_sources::{LineSource, LineSourceConfig, RpcSource};

/// Everything built from one config
pub struct Agent {
    pub registry: MetricsRegistry,
    pub channels: BTreeMap<String, Channel>,
    /// At most one: it owns stdin
    pub line_source: Option<LineSource>,
    pub rpc_sources: Vec<RpcSource>,
    pub sinks: Vec<WriterSink>,
    pub processors: Vec<(String, ProcessorMetricsHandle)>,
}

impl Agent {
    /// Build every component
    ///
    /// Formatter names are resolved here, so an unknown serializer fails
    /// before any event is accepted.
    pub fn build(
        config: &Config,
        formatters: &FormatterRegistry,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let registry = MetricsRegistry::new();

        let mut channels = BTreeMap::new();
        for (name, section) in &config.channels {
            let channel = Channel::with_counters(
                name.as_str(),
                ChannelConfig {
                    capacity: section.capacity,
                    transaction_capacity: section.transaction_capacity,
                    keep_alive: section.keep_alive,
                    byte_capacity: section.effective_byte_capacity(),
                },
                registry.channel(name),
            )
            .with_context(|| format!("failed to create channel '{name}'"))?;
            channels.insert(name.clone(), channel);
        }

        let mut line_source: Option<LineSource> = None;
        let mut rpc_sources = Vec::new();
        let mut processors = Vec::new();
        for (name, section) in &config.sources {
            let selector = build_selector(name, section, &channels)?;
            let processor = ChannelProcessor::new(selector);
            processors.push((name.clone(), processor.metrics_handle()));
            let counters = registry.source(name);

            match section.source_type {
                SourceType::Line => {
                    if let Some(existing) = &line_source {
                        bail!(
                            "sources '{}' and '{name}' both read stdin; only one line source is allowed",
                            existing.name()
                        );
                    }
                    let line_config = LineSourceConfig {
                        max_line_length: section.max_line_length,
                        ack_every_event: section.ack_every_event,
                    };
                    line_source = Some(LineSource::new(
                        name.as_str(),
                        processor,
                        line_config,
                        counters,
                    ));
                }
                SourceType::Rpc => {
                    rpc_sources.push(RpcSource::new(name.as_str(), processor, counters));
                }
            }
        }

        let mut sinks = Vec::new();
        for (name, section) in &config.sinks {
            sinks.push(build_sink(
                name,
                section,
                &channels,
                formatters,
                Arc::clone(&fs),
                &registry,
            )?);
        }

        tracing::info!(
            channels = channels.len(),
            line_sources = usize::from(line_source.is_some()),
            rpc_sources = rpc_sources.len(),
            sinks = sinks.len(),
            "agent built"
        );

        Ok(Self {
            registry,
            channels,
            line_source,
            rpc_sources,
            sinks,
            processors,
        })
    }

    /// Counter snapshot of every component
    pub fn metrics(&self) -> (RegistrySnapshot, Vec<(String, ProcessorSnapshot)>) {
        let processors = self
            .processors
            .iter()
            .map(|(name, handle)| (name.clone(), handle.snapshot()))
            .collect();
        (self.registry.snapshot(), processors)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("line_source", &self.line_source)
            .field("rpc_sources", &self.rpc_sources)
            .field("sinks", &self.sinks)
            .finish()
    }
}

fn build_selector(
    source_name: &str,
    section: &SourceConfig,
    channels: &BTreeMap<String, Channel>,
) -> Result<Arc<dyn ChannelSelector>> {
    let mut builder = SelectorBuilder::new();
    for channel_name in &section.channels {
        let channel = channels.get(channel_name).with_context(|| {
            format!("source '{source_name}' references unknown channel '{channel_name}'")
        })?;
        builder.register_channel(channel.clone());
    }

    let selector: Arc<dyn ChannelSelector> = match &section.selector {
        SelectorConfig::Replicating => Arc::new(
            builder
                .replicating()
                .with_context(|| format!("invalid selector for source '{source_name}'"))?,
        ),
        SelectorConfig::Multiplexing(m) => {
            let mut mux = builder.multiplexing(m.header.as_str());
            for (value, targets) in &m.mapping {
                mux = mux.map(value.as_str(), targets);
            }
            for (value, targets) in &m.optional {
                mux = mux.optional(value.as_str(), targets);
            }
            Arc::new(
                mux.default_channels(&m.default)
                    .build()
                    .with_context(|| format!("invalid selector for source '{source_name}'"))?,
            )
        }
    };
    Ok(selector)
}

fn build_sink(
    name: &str,
    section: &SinkConfig,
    channels: &BTreeMap<String, Channel>,
    formatters: &FormatterRegistry,
    fs: Arc<dyn FileSystem>,
    registry: &MetricsRegistry,
) -> Result<WriterSink> {
    let channel = channels
        .get(&section.channel)
        .with_context(|| {
            format!(
                "sink '{name}' references unknown channel '{}'",
                section.channel
            )
        })?
        .clone();

    let codec = CompressionCodec::from_name(&section.codec)
        .with_context(|| format!("sink '{name}' has unknown codec '{}'", section.codec))?;

    let options: FormatterOptions = section.serializer_options.clone();
    let formatter = formatters
        .get(&section.serializer, &options)
        .with_context(|| format!("sink '{name}' has unusable serializer"))?;

    let sink_config = WriterSinkConfig {
        directory: section.path.clone().into(),
        file_prefix: section.file_prefix.clone(),
        codec,
        batch_size: section.batch_size,
        roll_count: section.roll_count,
        append: section.append,
        backoff: section.backoff,
    };

    Ok(WriterSink::new(
        name,
        channel,
        fs,
        formatter,
        sink_config,
        registry.sink(name),
    ))
}

#[cfg(test)]
#[path = "agent_test.rs"]
mod agent_test;
