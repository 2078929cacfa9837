//! Built-in formatters

use std::collections::BTreeMap;
use std::io::{self, Write};

use spool_protocol::Event;

use super::{EventFormatter, FormatterOptions, bool_option};

/// Header written at the start of every `Writable` file
pub const WRITABLE_MAGIC: &[u8; 6] = b"SPOOL1";

/// Body bytes, optionally followed by a newline
///
/// Options: `append_newline` (default `true`).
#[derive(Debug, Clone)]
pub struct TextFormatter {
    append_newline: bool,
}

impl TextFormatter {
    pub fn new(options: &FormatterOptions) -> Self {
        Self {
            append_newline: bool_option(options, "append_newline", true),
        }
    }
}

impl EventFormatter for TextFormatter {
    fn name(&self) -> &str {
        "Text"
    }

    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(event.body())?;
        if self.append_newline {
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// Headers as `{k1=v1, k2=v2} ` followed by the body
///
/// Headers are sorted by key so output is stable. Options:
/// `append_newline` (default `true`).
#[derive(Debug, Clone)]
pub struct HeaderAndTextFormatter {
    append_newline: bool,
}

impl HeaderAndTextFormatter {
    pub fn new(options: &FormatterOptions) -> Self {
        Self {
            append_newline: bool_option(options, "append_newline", true),
        }
    }
}

impl EventFormatter for HeaderAndTextFormatter {
    fn name(&self) -> &str {
        "HeaderAndText"
    }

    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()> {
        let sorted: BTreeMap<_, _> = event.headers().iter().collect();
        out.write_all(b"{")?;
        for (i, (key, value)) in sorted.into_iter().enumerate() {
            if i > 0 {
                out.write_all(b", ")?;
            }
            write!(out, "{key}={value}")?;
        }
        out.write_all(b"} ")?;
        out.write_all(event.body())?;
        if self.append_newline {
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// One JSON object per line: `{"headers":{..},"body":".."}`
///
/// Non UTF-8 body bytes are replaced with U+FFFD.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl EventFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "Json"
    }

    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()> {
        let headers: BTreeMap<_, _> = event.headers().iter().collect();
        let value = serde_json::json!({
            "headers": headers,
            "body": String::from_utf8_lossy(event.body()),
        });
        serde_json::to_writer(&mut *out, &value).map_err(io::Error::other)?;
        out.write_all(b"\n")
    }
}

/// Length-prefixed binary records
///
/// File layout: [`WRITABLE_MAGIC`], then per event
/// `[u16 header count][per header: u16 key len, key, u16 value len, value][u32 body len][body]`,
/// all integers big-endian.
#[derive(Debug, Clone, Default)]
pub struct WritableFormatter;

impl WritableFormatter {
    fn write_str(out: &mut dyn Write, s: &str) -> io::Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "header longer than 65535 bytes"))?;
        out.write_all(&len.to_be_bytes())?;
        out.write_all(s.as_bytes())
    }
}

impl EventFormatter for WritableFormatter {
    fn name(&self) -> &str {
        "Writable"
    }

    fn after_create(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(WRITABLE_MAGIC)
    }

    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()> {
        let count = u16::try_from(event.headers().len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many headers"))?;
        out.write_all(&count.to_be_bytes())?;

        let sorted: BTreeMap<_, _> = event.headers().iter().collect();
        for (key, value) in sorted {
            Self::write_str(out, key)?;
            Self::write_str(out, value)?;
        }

        let body_len = u32::try_from(event.body_len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "body longer than 4 GiB"))?;
        out.write_all(&body_len.to_be_bytes())?;
        out.write_all(event.body())
    }
}
