//! `[log]` section: the agent's own diagnostics
//!
//! A line source answers every event on stdout, so diagnostics go to stderr
//! unless configured otherwise, and validation refuses stdout while a line
//! source acknowledges events.

use serde::Deserialize;

/// Filter used when neither the CLI nor the config names one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Diagnostic record layout
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per record
    Json,
}

/// Stream diagnostics are written to
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
}

/// Diagnostics settings
///
/// `level` is a `tracing` filter directive: a bare level (`"debug"`) or a
/// per-crate list (`"info,spool_channel=trace"`).
///
/// ```toml
/// [log]
/// level = "info,spool_sinks=debug"
/// format = "json"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
        }
    }
}

impl LogConfig {
    /// Filter directive to install, a CLI override winning over the file
    pub fn filter<'a>(&'a self, cli_override: Option<&'a str>) -> &'a str {
        match cli_override.map(str::trim).filter(|s| !s.is_empty()) {
            Some(directive) => directive,
            None if self.level.trim().is_empty() => DEFAULT_LOG_FILTER,
            None => self.level.trim(),
        }
    }

    /// Whether diagnostics would interleave with line source replies
    #[inline]
    pub fn shares_stdout(&self) -> bool {
        self.output == LogOutput::Stdout
    }
}
