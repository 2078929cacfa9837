//! Event formatters
//!
//! A formatter turns an [`Event`] into the bytes stored in an output file.
//! Formatters are resolved by name through a [`FormatterRegistry`]: built-in
//! names first, then factories registered by the embedding application.

mod builtin;
mod registry;

use std::collections::BTreeMap;
use std::io::{self, Write};

use spool_protocol::Event;

pub use builtin::{
    HeaderAndTextFormatter, JsonFormatter, TextFormatter, WRITABLE_MAGIC, WritableFormatter,
};
pub use registry::{BuiltinFormatter, DEFAULT_FORMATTER, FormatterFactory, FormatterRegistry};

/// String options passed to a formatter factory
pub type FormatterOptions = BTreeMap<String, String>;

/// Encodes events onto an output stream
///
/// The stream is passed to every call; a formatter keeps no handle to it.
pub trait EventFormatter: Send {
    /// Name the formatter was resolved under
    fn name(&self) -> &str;

    /// Called once after a new file is created, before any event
    fn after_create(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    /// Called when an existing file is reopened for appending
    fn after_reopen(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    /// Encode one event
    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()>;

    /// Called once before the file is closed
    fn before_close(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// Read a boolean option, falling back to `default` when absent or invalid
pub(crate) fn bool_option(options: &FormatterOptions, key: &str, default: bool) -> bool {
    match options.get(key).map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "true" => true,
        Some(v) if v == "false" => false,
        Some(v) => {
            tracing::warn!(option = key, value = %v, default, "invalid boolean formatter option");
            default
        }
        None => default,
    }
}
