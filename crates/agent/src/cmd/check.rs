//! Check command - validate a config and list what it builds

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use spool_config::SelectorConfig;
use spool_sinks::{FormatterRegistry, LocalFileSystem};

use crate::agent::Agent;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    // Building resolves formatters and selectors too; nothing is opened yet
    let agent = Agent::build(
        &config,
        &FormatterRegistry::new(),
        Arc::new(LocalFileSystem::new()),
    )?;

    println!("configuration OK");
    for (name, channel) in &agent.channels {
        println!(
            "  channel {name}: capacity={} transaction_capacity={} keep_alive={:?}",
            channel.capacity(),
            channel.transaction_capacity(),
            channel.keep_alive()
        );
    }
    for (name, source) in &config.sources {
        let selector = match &source.selector {
            SelectorConfig::Replicating => "replicating".to_string(),
            SelectorConfig::Multiplexing(m) => format!("multiplexing on '{}'", m.header),
        };
        println!(
            "  source {name}: {:?} -> [{}] ({selector})",
            source.source_type,
            source.channels.join(", ")
        );
    }
    for sink in &agent.sinks {
        println!(
            "  sink {}: channel={} writer={:?}",
            sink.name(),
            sink.channel().name(),
            sink.writer()
        );
    }
    Ok(())
}
