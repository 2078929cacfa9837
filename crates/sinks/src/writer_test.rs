//! Tests for DurableWriter
//!
//! Output is verified by decompressing the written files.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use spool_metrics::SinkCounters;
use spool_protocol::Event;
use tempfile::TempDir;

use crate::codec::CompressionCodec;
use crate::error::SinkError;
use crate::formatter::{EventFormatter, FormatterOptions, FormatterRegistry, WRITABLE_MAGIC};
use crate::fs::{DurableOutput, FileSystem, LocalFileSystem};
use crate::writer::{DurableWriter, WriterConfig};

fn text_writer(config: WriterConfig) -> DurableWriter {
    let formatter = FormatterRegistry::new()
        .get("Text", &FormatterOptions::new())
        .unwrap();
    DurableWriter::new(Arc::new(LocalFileSystem::new()), formatter, config)
}

fn decode_file(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    String::from_utf8(CompressionCodec::Lz4.decode(&bytes).unwrap()).unwrap()
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

/// Formatter with a footer, to exercise `before_close`
struct FooterFormatter;

impl EventFormatter for FooterFormatter {
    fn name(&self) -> &str {
        "footer"
    }

    fn after_create(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(b"BEGIN\n")
    }

    fn write(&mut self, event: &Event, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(event.body())?;
        out.write_all(b"\n")
    }

    fn before_close(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(b"END\n")
    }
}

/// Filesystem whose files fail on demand
#[derive(Debug, Default)]
struct FailingFileSystem {
    fail_create: bool,
    fail_sync: bool,
}

struct FailingOutput {
    fail_sync: bool,
}

impl Write for FailingOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DurableOutput for FailingOutput {
    fn sync(&mut self) -> io::Result<()> {
        if self.fail_sync {
            Err(io::Error::other("disk gone"))
        } else {
            Ok(())
        }
    }
}

impl FileSystem for FailingFileSystem {
    fn create(&self, _path: &Path) -> io::Result<Box<dyn DurableOutput>> {
        if self.fail_create {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        Ok(Box::new(FailingOutput {
            fail_sync: self.fail_sync,
        }))
    }

    fn append(&self, path: &Path) -> io::Result<Box<dyn DurableOutput>> {
        self.create(path)
    }

    fn is_file(&self, _path: &Path) -> bool {
        false
    }
}

fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_operations_before_open() {
    let mut writer = text_writer(WriterConfig::default());
    assert!(!writer.is_open());
    assert!(matches!(writer.append(&Event::new("x")), Err(SinkError::NotOpen)));
    assert!(matches!(writer.sync(), Err(SinkError::NotOpen)));
    writer.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn test_open_append_close_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");

    let mut writer = text_writer(WriterConfig::default());
    writer.open(&path).unwrap();
    assert!(writer.is_open());
    assert_eq!(writer.codec(), Some(CompressionCodec::Lz4));
    assert_eq!(writer.path(), Some(path.as_path()));

    writer.append(&Event::new("one")).unwrap();
    writer.append(&Event::new("two")).unwrap();
    writer.close().unwrap();

    assert!(!writer.is_open());
    assert_eq!(decode_file(&path), "one\ntwo\n");
}

#[test]
fn test_sync_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let counters = Arc::new(SinkCounters::new());
    let formatter = FormatterRegistry::new()
        .get("Text", &FormatterOptions::new())
        .unwrap();
    let mut writer = DurableWriter::with_counters(
        Arc::new(LocalFileSystem::new()),
        formatter,
        WriterConfig::default(),
        Arc::clone(&counters),
    );

    writer.open(&path).unwrap();
    writer.append(&Event::new("a")).unwrap();

    writer.sync().unwrap();
    assert!(writer.is_finished());
    let after_first = file_len(&path);

    writer.sync().unwrap();
    assert!(writer.is_finished());
    assert_eq!(file_len(&path), after_first);
    assert_eq!(decode_file(&path), "a\n");

    let s = counters.snapshot();
    assert_eq!(s.syncs, 2);
    assert_eq!(s.files_opened, 1);
    assert_eq!(s.write_errors, 0);
}

#[test]
fn test_append_after_sync_stays_decodable() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let mut writer = text_writer(WriterConfig::default());
    writer.open(&path).unwrap();

    let mut expected = String::new();
    for round in 0..5 {
        for i in 0..3 {
            let body = format!("r{round}-e{i}");
            writer.append(&Event::new(body.clone())).unwrap();
            assert!(!writer.is_finished());
            expected.push_str(&body);
            expected.push('\n');
        }
        writer.sync().unwrap();
        writer.sync().unwrap();

        // Everything synced so far is readable while the file is still open
        assert_eq!(decode_file(&path), expected);
    }

    writer.close().unwrap();
    assert_eq!(decode_file(&path), expected);
}

#[test]
fn test_close_after_sync_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let mut writer = text_writer(WriterConfig::default());
    writer.open(&path).unwrap();
    writer.append(&Event::new("x")).unwrap();
    writer.sync().unwrap();
    let synced = file_len(&path);

    writer.close().unwrap();
    assert_eq!(file_len(&path), synced);
    writer.close().unwrap();
}

#[test]
fn test_reopen_closes_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = temp_path(&dir, "first.lz4");
    let second = temp_path(&dir, "second.lz4");
    let mut writer = text_writer(WriterConfig::default());

    writer.open(&first).unwrap();
    writer.append(&Event::new("1")).unwrap();
    writer.open(&second).unwrap();
    writer.append(&Event::new("2")).unwrap();
    writer.close().unwrap();

    assert_eq!(decode_file(&first), "1\n");
    assert_eq!(decode_file(&second), "2\n");
}

// ============================================================================
// Codecs and formatter hooks
// ============================================================================

#[test]
fn test_uncompressed_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.txt");
    let mut writer = text_writer(WriterConfig::default());

    writer.open_with(&path, CompressionCodec::None).unwrap();
    writer.append(&Event::new("plain")).unwrap();
    writer.sync().unwrap();
    writer.append(&Event::new("text")).unwrap();
    writer.close().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "plain\ntext\n");
}

#[test]
fn test_header_and_footer_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let mut writer = DurableWriter::new(
        Arc::new(LocalFileSystem::new()),
        Box::new(FooterFormatter),
        WriterConfig::default(),
    );

    writer.open(&path).unwrap();
    writer.append(&Event::new("body")).unwrap();
    writer.sync().unwrap();
    writer.close().unwrap();

    assert_eq!(decode_file(&path), "BEGIN\nbody\nEND\n");
}

#[test]
fn test_writable_file_starts_with_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.bin.lz4");
    let formatter = FormatterRegistry::new()
        .get("Writable", &FormatterOptions::new())
        .unwrap();
    let mut writer = DurableWriter::new(
        Arc::new(LocalFileSystem::new()),
        formatter,
        WriterConfig::default(),
    );

    writer.open(&path).unwrap();
    writer.append(&Event::new("abc")).unwrap();
    writer.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let decoded = CompressionCodec::Lz4.decode(&bytes).unwrap();
    assert!(decoded.starts_with(WRITABLE_MAGIC));
    assert!(decoded.ends_with(b"abc"));
}

#[test]
fn test_append_support_reopens_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let config = WriterConfig {
        append: true,
        ..WriterConfig::default()
    };

    let mut writer = text_writer(config);
    writer.open(&path).unwrap();
    writer.append(&Event::new("first")).unwrap();
    writer.close().unwrap();

    writer.open(&path).unwrap();
    writer.append(&Event::new("second")).unwrap();
    writer.close().unwrap();

    assert_eq!(decode_file(&path), "first\nsecond\n");
}

#[test]
fn test_without_append_support_file_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "events.lz4");
    let mut writer = text_writer(WriterConfig::default());

    writer.open(&path).unwrap();
    writer.append(&Event::new("first")).unwrap();
    writer.close().unwrap();

    writer.open(&path).unwrap();
    writer.append(&Event::new("second")).unwrap();
    writer.close().unwrap();

    assert_eq!(decode_file(&path), "second\n");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failed_open_leaves_writer_closed() {
    let counters = Arc::new(SinkCounters::new());
    let fs = FailingFileSystem {
        fail_create: true,
        ..Default::default()
    };
    let mut writer = DurableWriter::with_counters(
        Arc::new(fs),
        Box::new(FooterFormatter),
        WriterConfig::default(),
        Arc::clone(&counters),
    );

    let err = writer.open("/nowhere/events.lz4").unwrap_err();
    assert!(matches!(err, SinkError::Io { op: "open", .. }));
    assert!(!writer.is_open());
    writer.close().unwrap();
    assert_eq!(counters.snapshot().write_errors, 1);
    assert_eq!(counters.snapshot().files_opened, 0);
}

#[test]
fn test_failed_sync_still_releases_on_close() {
    let fs = FailingFileSystem {
        fail_sync: true,
        ..Default::default()
    };
    let mut writer = DurableWriter::new(
        Arc::new(fs),
        Box::new(FooterFormatter),
        WriterConfig::default(),
    );

    writer.open("events.lz4").unwrap();
    writer.append(&Event::new("x")).unwrap();
    assert!(matches!(writer.sync(), Err(SinkError::Io { op: "sync", .. })));

    assert!(writer.close().is_err());
    assert!(!writer.is_open());
    writer.close().unwrap();
}
