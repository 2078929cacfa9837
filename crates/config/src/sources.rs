//! Source configuration types
//!
//! Each source names the channels its processor may deliver to and how a
//! selector picks among them.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Named source instances
pub type SourcesConfig = BTreeMap<String, SourceConfig>;

/// Kind of inbound collaborator
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Newline-delimited events on stdin, replies on stdout
    #[default]
    Line,
    /// Embedded request handler; not driven by the agent binary
    Rpc,
}

/// Configuration for a single source
///
/// # Example
///
/// ```toml
/// [sources.lines]
/// type = "line"
/// channels = ["mem", "audit"]
///
/// [sources.lines.selector]
/// type = "multiplexing"
/// header = "type"
/// default = ["mem"]
///
/// [sources.lines.selector.mapping]
/// error = ["audit"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Channels the selector may route to, in registration order
    pub channels: Vec<String>,

    /// Routing policy
    /// Default: replicating
    pub selector: SelectorConfig,

    /// Line source: longer lines are truncated
    /// Default: 512
    pub max_line_length: usize,

    /// Line source: reply after every line
    /// Default: true
    pub ack_every_event: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source_type: SourceType::Line,
            channels: Vec::new(),
            selector: SelectorConfig::Replicating,
            max_line_length: 512,
            ack_every_event: true,
        }
    }
}

/// Channel selector configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SelectorConfig {
    /// Every event goes to every channel
    #[default]
    Replicating,
    /// Route by the value of one header
    Multiplexing(MultiplexingConfig),
}

impl SelectorConfig {
    /// Every channel name the selector refers to
    pub fn referenced_channels(&self) -> Vec<&str> {
        match self {
            Self::Replicating => Vec::new(),
            Self::Multiplexing(m) => m
                .default
                .iter()
                .chain(m.mapping.values().flatten())
                .chain(m.optional.values().flatten())
                .map(String::as_str)
                .collect(),
        }
    }
}

/// Header-value routing table
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MultiplexingConfig {
    /// Header whose value picks the route
    pub header: String,

    /// Channels used when the header is missing or its value is unmapped
    pub default: Vec<String>,

    /// Required channels per header value
    pub mapping: BTreeMap<String, Vec<String>>,

    /// Best-effort channels per header value
    pub optional: BTreeMap<String, Vec<String>>,
}
