//! Compression codecs and their output streams
//!
//! A compressed stream is either *writing* or *finished*. Finishing seals the
//! current compressed frame so everything written so far is decodable; a
//! finished stream refuses writes until `reset_state` starts a new frame on
//! the same output. Files therefore hold one frame per sync. A single LZ4
//! `FrameDecoder` stops at the end of its frame, so reading a file back goes
//! through [`CompressionCodec::decode`], which decodes frames until the input
//! is exhausted.
//!
//! ```text
//! write ──→ [Writing] ──finish──→ [Finished] ──reset_state──→ [Writing]
//!                                     │
//!                                     └── flush / sync the output
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::mem;

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::fs::DurableOutput;

/// Compression applied to writer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionCodec {
    /// Bytes are written as-is
    None,
    /// LZ4 frame format
    #[default]
    Lz4,
}

impl CompressionCodec {
    /// Parse a configured codec name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" | "" => Some(Self::None),
            "lz4" => Some(Self::Lz4),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
        }
    }

    /// Suffix appended to output file names
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lz4 => ".lz4",
        }
    }

    /// Decode everything written by this codec, across all frames
    pub fn decode(self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(bytes.len());
        match self {
            Self::None => out.extend_from_slice(bytes),
            Self::Lz4 => {
                let mut input = bytes;
                while !input.is_empty() {
                    let remaining = input.len();
                    FrameDecoder::new(&mut input).read_to_end(&mut out)?;
                    if input.len() == remaining {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "lz4 frame decoder made no progress",
                        ));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Wrap `output` in a writing stream for this codec
    pub fn wrap(self, output: Box<dyn DurableOutput>) -> CompressedStream {
        CompressedStream {
            codec: self,
            state: State::Writing(self.encoder(output)),
            bytes_in: 0,
        }
    }

    fn encoder(self, output: Box<dyn DurableOutput>) -> Encoder {
        match self {
            Self::None => Encoder::Plain(output),
            Self::Lz4 => Encoder::Lz4(FrameEncoder::new(output)),
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum Encoder {
    Plain(Box<dyn DurableOutput>),
    Lz4(FrameEncoder<Box<dyn DurableOutput>>),
}

enum State {
    Writing(Encoder),
    Finished(Box<dyn DurableOutput>),
    /// A finish failed part way; the output is gone
    Broken,
}

/// Output stream of a [`CompressionCodec`]
pub struct CompressedStream {
    codec: CompressionCodec,
    state: State,
    /// Uncompressed bytes accepted
    bytes_in: u64,
}

impl CompressedStream {
    #[inline]
    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished(_))
    }

    /// Uncompressed bytes written through this stream
    #[inline]
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Seal the current frame; later writes need [`reset_state`](Self::reset_state)
    ///
    /// Finishing a stream that is already finished is an error.
    pub fn finish(&mut self) -> io::Result<()> {
        match mem::replace(&mut self.state, State::Broken) {
            State::Writing(Encoder::Plain(mut out)) => {
                out.flush()?;
                self.state = State::Finished(out);
                Ok(())
            }
            State::Writing(Encoder::Lz4(encoder)) => {
                let out = encoder.finish()?;
                self.state = State::Finished(out);
                Ok(())
            }
            finished @ State::Finished(_) => {
                self.state = finished;
                Err(io::Error::other("compressed stream already finished"))
            }
            State::Broken => Err(broken()),
        }
    }

    /// Start a new frame after [`finish`](Self::finish)
    ///
    /// No-op on a stream that is still writing.
    pub fn reset_state(&mut self) -> io::Result<()> {
        match mem::replace(&mut self.state, State::Broken) {
            State::Finished(out) => {
                self.state = State::Writing(self.codec.encoder(out));
                Ok(())
            }
            State::Broken => Err(broken()),
            writing => {
                self.state = writing;
                Ok(())
            }
        }
    }

    /// Underlying output, available while finished (or uncompressed)
    pub fn output_mut(&mut self) -> Option<&mut dyn DurableOutput> {
        match &mut self.state {
            State::Finished(out) | State::Writing(Encoder::Plain(out)) => Some(out.as_mut()),
            _ => None,
        }
    }

    /// Finish if needed, flush, and release the output
    pub fn close(mut self) -> io::Result<()> {
        if !self.is_finished() {
            self.finish()?;
        }
        if let Some(out) = self.output_mut() {
            out.flush()?;
        }
        Ok(())
    }
}

impl Write for CompressedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match &mut self.state {
            State::Writing(Encoder::Plain(out)) => out.write(buf)?,
            State::Writing(Encoder::Lz4(encoder)) => encoder.write(buf)?,
            State::Finished(_) => {
                return Err(io::Error::other(
                    "compressed stream is finished; reset_state before writing",
                ));
            }
            State::Broken => return Err(broken()),
        };
        self.bytes_in += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            State::Writing(Encoder::Plain(out)) | State::Finished(out) => out.flush(),
            State::Writing(Encoder::Lz4(encoder)) => encoder.flush(),
            State::Broken => Err(broken()),
        }
    }
}

impl fmt::Debug for CompressedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Writing(_) => "writing",
            State::Finished(_) => "finished",
            State::Broken => "broken",
        };
        f.debug_struct("CompressedStream")
            .field("codec", &self.codec)
            .field("state", &state)
            .field("bytes_in", &self.bytes_in)
            .finish()
    }
}

fn broken() -> io::Error {
    io::Error::other("compressed stream is unusable after a failed finish")
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
