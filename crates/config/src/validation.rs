//! Configuration validation
//!
//! Validates config consistency before anything is built:
//! - Every channel referenced by a source, selector or sink is declared
//! - Channel limits are usable
//! - Required fields are present
//! - Codec names are known
//! - Diagnostics do not share stdout with line source replies

use crate::Config;
use crate::channels::ChannelConfig;
use crate::error::{ConfigError, Result};
use crate::sinks::SinkConfig;
use crate::sources::{SelectorConfig, SourceConfig, SourceType};

/// Codec names accepted in `[sinks.*] codec` (case-insensitive, empty = none)
pub const KNOWN_CODECS: &[&str] = &["", "none", "lz4"];

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.channels.is_empty() && (!config.sources.is_empty() || !config.sinks.is_empty()) {
        return Err(ConfigError::NoChannels);
    }

    for (name, channel) in &config.channels {
        validate_channel(name, channel)?;
    }
    for (name, source) in &config.sources {
        validate_source(config, name, source)?;
    }
    for (name, sink) in &config.sinks {
        validate_sink(config, name, sink)?;
    }
    validate_log_output(config)
}

fn validate_log_output(config: &Config) -> Result<()> {
    if !config.log.shares_stdout() {
        return Ok(());
    }
    let acking = config
        .sources
        .iter()
        .find(|(_, s)| s.source_type == SourceType::Line && s.ack_every_event);
    match acking {
        Some((name, _)) => Err(ConfigError::invalid_value(
            "log",
            "log",
            "output",
            format!("stdout carries replies of line source '{name}'"),
        )),
        None => Ok(()),
    }
}

fn validate_channel(name: &str, channel: &ChannelConfig) -> Result<()> {
    if channel.capacity == 0 {
        return Err(ConfigError::invalid_value(
            "channel",
            name,
            "capacity",
            "must be greater than 0",
        ));
    }
    if channel.transaction_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "channel",
            name,
            "transaction_capacity",
            "must be greater than 0",
        ));
    }
    if channel.transaction_capacity > channel.capacity {
        return Err(ConfigError::invalid_value(
            "channel",
            name,
            "transaction_capacity",
            format!(
                "{} exceeds capacity {}",
                channel.transaction_capacity, channel.capacity
            ),
        ));
    }
    Ok(())
}

fn validate_source(config: &Config, name: &str, source: &SourceConfig) -> Result<()> {
    if source.channels.is_empty() {
        return Err(ConfigError::missing_field("source", name, "channels"));
    }
    for channel in &source.channels {
        if !config.channels.contains_key(channel) {
            return Err(ConfigError::unknown_channel("source", name, channel));
        }
    }

    if let SelectorConfig::Multiplexing(m) = &source.selector
        && m.header.is_empty()
    {
        return Err(ConfigError::missing_field("selector", name, "header"));
    }

    // Selectors can only route to channels their source registered
    for channel in source.selector.referenced_channels() {
        if !source.channels.iter().any(|c| c == channel) {
            return Err(ConfigError::unknown_channel("selector", name, channel));
        }
    }

    if source.max_line_length == 0 {
        return Err(ConfigError::invalid_value(
            "source",
            name,
            "max_line_length",
            "must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_sink(config: &Config, name: &str, sink: &SinkConfig) -> Result<()> {
    if sink.channel.is_empty() {
        return Err(ConfigError::missing_field("sink", name, "channel"));
    }
    if !config.channels.contains_key(&sink.channel) {
        return Err(ConfigError::unknown_channel("sink", name, &sink.channel));
    }
    if sink.path.is_empty() {
        return Err(ConfigError::missing_field("sink", name, "path"));
    }
    if sink.serializer.is_empty() {
        return Err(ConfigError::missing_field("sink", name, "serializer"));
    }
    if !KNOWN_CODECS.contains(&sink.codec.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::invalid_value(
            "sink",
            name,
            "codec",
            format!("unknown codec '{}' (expected none or lz4)", sink.codec),
        ));
    }
    if sink.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "sink",
            name,
            "batch_size",
            "must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;
