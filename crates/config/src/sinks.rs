//! Sink configuration types
//!
//! Each sink drains one channel into rolling files.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Named sink instances
pub type SinksConfig = BTreeMap<String, SinkConfig>;

/// Configuration for a single file sink
///
/// # Example
///
/// ```toml
/// [sinks.files]
/// channel = "mem"
/// path = "out/"
/// serializer = "HeaderAndText"
/// codec = "lz4"
/// roll_count = 10000
///
/// [sinks.files.serializer_options]
/// append_newline = "true"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Channel drained by this sink (required)
    pub channel: String,

    /// Output directory (required)
    pub path: String,

    /// File name prefix: `<prefix>.<counter><ext>`
    /// Default: "events"
    pub file_prefix: String,

    /// Formatter name, built-in or registered
    /// Default: "Text"
    pub serializer: String,

    /// Options passed to the formatter factory
    pub serializer_options: BTreeMap<String, String>,

    /// Compression codec (none, lz4)
    /// Default: lz4
    pub codec: String,

    /// Maximum events per drain transaction
    /// Default: 100
    pub batch_size: usize,

    /// Events per file before rolling; 0 never rolls
    /// Default: 10000
    pub roll_count: u64,

    /// Reopen existing files in append mode
    /// Default: false
    pub append: bool,

    /// Pause after an empty or failed batch
    /// Default: 500ms
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            path: String::new(),
            file_prefix: "events".into(),
            serializer: "Text".into(),
            serializer_options: BTreeMap::new(),
            codec: "lz4".into(),
            batch_size: 100,
            roll_count: 10_000,
            append: false,
            backoff: Duration::from_millis(500),
        }
    }
}
