//! Outbound filesystem interface
//!
//! The writer only needs create, append and an existence check from the
//! destination store, plus an output that separates `flush` (hand bytes to
//! the store) from `sync` (make them durable).

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Write buffer for local files
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Destination store the writer opens files on
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Create (or truncate) `path`
    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableOutput>>;

    /// Open an existing `path` for appending
    fn append(&self, path: &Path) -> io::Result<Box<dyn DurableOutput>>;

    /// Whether `path` exists and is a regular file
    fn is_file(&self, path: &Path) -> bool;
}

/// Byte sink with a durable sync separate from flush
pub trait DurableOutput: Write + Send {
    /// Flush and force written bytes to durable storage
    fn sync(&mut self) -> io::Result<()>;
}

/// Local disk implementation of [`FileSystem`]
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    buffer_size: usize,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    fn ensure_parent(path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for LocalFileSystem {
    fn create(&self, path: &Path) -> io::Result<Box<dyn DurableOutput>> {
        Self::ensure_parent(path)?;
        let file = File::create(path)?;
        Ok(Box::new(LocalOutput {
            writer: BufWriter::with_capacity(self.buffer_size, file),
        }))
    }

    fn append(&self, path: &Path) -> io::Result<Box<dyn DurableOutput>> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Box::new(LocalOutput {
            writer: BufWriter::with_capacity(self.buffer_size, file),
        }))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

struct LocalOutput {
    writer: BufWriter<File>,
}

impl Write for LocalOutput {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl DurableOutput for LocalOutput {
    fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.txt");
        let fs = LocalFileSystem::new();

        let mut out = fs.create(&path).unwrap();
        out.write_all(b"hello").unwrap();
        out.sync().unwrap();

        assert!(fs.is_file(&path));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_append_keeps_existing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"one\n").unwrap();

        let fs = LocalFileSystem::with_buffer_size(16);
        let mut out = fs.append(&path).unwrap();
        out.write_all(b"two\n").unwrap();
        out.sync().unwrap();
        drop(out);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_append_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new();
        assert!(fs.append(&dir.path().join("missing")).is_err());
        assert!(!fs.is_file(dir.path()));
    }
}
