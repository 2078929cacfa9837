//! Source errors

use std::io;

use thiserror::Error;

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors that end a source's read loop
///
/// Delivery failures are not errors here; they are answered with
/// `Status::Failed` and the source keeps reading.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading requests or writing replies failed
    #[error("source '{source_name}' {op} failed: {source}")]
    Io {
        source_name: String,
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    pub fn io(source_name: impl Into<String>, op: &'static str, source: io::Error) -> Self {
        Self::Io {
            source_name: source_name.into(),
            op,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = SourceError::io("stdin", "read", io::Error::other("closed"));
        assert_eq!(err.to_string(), "source 'stdin' read failed: closed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
