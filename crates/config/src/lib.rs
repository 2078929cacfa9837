//! Spool Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Every section is optional; only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use spool_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[channels.mem]\n[sinks.files]\nchannel = \"mem\"\npath = \"out/\"",
//! )
//! .unwrap();
//! assert_eq!(config.channels["mem"].capacity, 100);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [channels.mem]
//! capacity = 1000
//!
//! [sources.stdin]
//! channels = ["mem"]
//!
//! [sinks.files]
//! channel = "mem"
//! path = "out/"
//! ```

mod channels;
mod error;
mod logging;
mod sinks;
mod sources;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use channels::{ChannelConfig, ChannelsConfig};
pub use error::{ConfigError, Result};
pub use logging::{DEFAULT_LOG_FILTER, LogConfig, LogFormat, LogOutput};
pub use sinks::{SinkConfig, SinksConfig};
pub use sources::{MultiplexingConfig, SelectorConfig, SourceConfig, SourceType, SourcesConfig};
pub use validation::{KNOWN_CODECS, validate_config};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Bounded channels, by name
    pub channels: ChannelsConfig,

    /// Inbound sources, by name
    pub sources: SourcesConfig,

    /// File sinks, by name
    pub sinks: SinksConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
