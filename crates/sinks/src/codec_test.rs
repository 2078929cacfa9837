//! Tests for compressed streams

use std::io::{self, Read, Write};
use std::sync::Arc;

use lz4_flex::frame::FrameDecoder;
use parking_lot::Mutex;

use crate::codec::CompressionCodec;
use crate::fs::DurableOutput;

/// In-memory output that records syncs
#[derive(Clone, Default)]
struct SharedOutput {
    bytes: Arc<Mutex<Vec<u8>>>,
    syncs: Arc<Mutex<usize>>,
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DurableOutput for SharedOutput {
    fn sync(&mut self) -> io::Result<()> {
        *self.syncs.lock() += 1;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Vec<u8> {
    CompressionCodec::Lz4.decode(bytes).unwrap()
}

// ============================================================================
// Codec names
// ============================================================================

#[test]
fn test_codec_names() {
    assert_eq!(CompressionCodec::from_name("lz4"), Some(CompressionCodec::Lz4));
    assert_eq!(CompressionCodec::from_name("LZ4"), Some(CompressionCodec::Lz4));
    assert_eq!(CompressionCodec::from_name("none"), Some(CompressionCodec::None));
    assert_eq!(CompressionCodec::from_name("gzip"), None);
    assert_eq!(CompressionCodec::default(), CompressionCodec::Lz4);
    assert_eq!(CompressionCodec::Lz4.file_extension(), ".lz4");
    assert_eq!(CompressionCodec::None.file_extension(), "");
    assert_eq!(CompressionCodec::Lz4.to_string(), "lz4");
}

// ============================================================================
// LZ4 stream lifecycle
// ============================================================================

#[test]
fn test_lz4_finish_seals_decodable_frame() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));

    stream.write_all(b"hello world").unwrap();
    assert!(!stream.is_finished());
    stream.finish().unwrap();
    assert!(stream.is_finished());

    assert_eq!(decode(&output.bytes.lock()), b"hello world");
    assert_eq!(stream.bytes_in(), 11);
}

#[test]
fn test_write_after_finish_requires_reset() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));

    stream.write_all(b"one").unwrap();
    stream.finish().unwrap();
    assert!(stream.write_all(b"two").is_err());

    stream.reset_state().unwrap();
    stream.write_all(b"two").unwrap();
    stream.finish().unwrap();

    assert_eq!(decode(&output.bytes.lock()), b"onetwo");
}

#[test]
fn test_double_finish_is_an_error() {
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(SharedOutput::default()));
    stream.finish().unwrap();
    assert!(stream.finish().is_err());
    // Still finished and usable after the rejected call
    assert!(stream.is_finished());
    stream.reset_state().unwrap();
    stream.write_all(b"x").unwrap();
}

#[test]
fn test_reset_while_writing_is_noop() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));
    stream.write_all(b"abc").unwrap();
    stream.reset_state().unwrap();
    stream.write_all(b"def").unwrap();
    stream.close().unwrap();

    assert_eq!(decode(&output.bytes.lock()), b"abcdef");
}

#[test]
fn test_many_frames_decode_in_order() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));

    let mut expected = Vec::new();
    for i in 0..20 {
        let line = format!("line {i}\n");
        stream.reset_state().unwrap();
        stream.write_all(line.as_bytes()).unwrap();
        stream.finish().unwrap();
        expected.extend_from_slice(line.as_bytes());
    }

    assert_eq!(decode(&output.bytes.lock()), expected);
}

#[test]
fn test_decode_reads_past_the_first_frame() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));
    stream.write_all(b"abc").unwrap();
    for _ in 0..10 {
        stream.finish().unwrap();
        stream.reset_state().unwrap();
        stream.write_all(b"x").unwrap();
    }
    stream.close().unwrap();

    let bytes = output.bytes.lock().clone();

    // A lone frame decoder stops after the first sync
    let mut first = Vec::new();
    FrameDecoder::new(bytes.as_slice())
        .read_to_end(&mut first)
        .unwrap();
    assert_eq!(first, b"abc");

    assert_eq!(CompressionCodec::Lz4.decode(&bytes).unwrap(), b"abcxxxxxxxxxx");
}

#[test]
fn test_decode_plain_and_corrupt_input() {
    assert_eq!(CompressionCodec::None.decode(b"raw").unwrap(), b"raw");
    assert!(CompressionCodec::Lz4.decode(b"").unwrap().is_empty());
    assert!(CompressionCodec::Lz4.decode(b"not lz4 at all").is_err());
}

#[test]
fn test_output_available_only_when_finished() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::Lz4.wrap(Box::new(output.clone()));
    assert!(stream.output_mut().is_none());

    stream.finish().unwrap();
    stream.output_mut().unwrap().sync().unwrap();
    assert_eq!(*output.syncs.lock(), 1);
}

// ============================================================================
// Uncompressed stream
// ============================================================================

#[test]
fn test_none_codec_passes_bytes_through() {
    let output = SharedOutput::default();
    let mut stream = CompressionCodec::None.wrap(Box::new(output.clone()));

    stream.write_all(b"plain ").unwrap();
    assert!(stream.output_mut().is_some());
    stream.finish().unwrap();
    assert!(stream.write_all(b"rejected").is_err());
    stream.reset_state().unwrap();
    stream.write_all(b"text").unwrap();
    stream.close().unwrap();

    assert_eq!(output.bytes.lock().as_slice(), b"plain text");
}
