//! Routing error types

use thiserror::Error;

/// Result type for selector construction
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors that can occur while building a selector
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Channel name not registered with the builder
    #[error("unknown channel '{name}' in selector configuration")]
    UnknownChannel {
        /// Name of the missing channel
        name: String,
    },

    /// Selector built without any channels
    #[error("selector has no channels")]
    NoChannels,

    /// Too many channels to address with a `ChannelId`
    #[error("selector supports at most {max} channels")]
    TooManyChannels {
        /// Maximum supported
        max: usize,
    },

    /// Multiplexing selector without a header to inspect
    #[error("multiplexing selector requires a header name")]
    MissingHeader,

    /// Same header value mapped twice
    #[error("duplicate mapping for header value '{value}'")]
    DuplicateMapping {
        /// Header value mapped more than once
        value: String,
    },
}

impl RoutingError {
    /// Create an UnknownChannel error
    #[inline]
    pub fn unknown_channel(name: impl Into<String>) -> Self {
        Self::UnknownChannel { name: name.into() }
    }

    /// Create a DuplicateMapping error
    #[inline]
    pub fn duplicate_mapping(value: impl Into<String>) -> Self {
        Self::DuplicateMapping {
            value: value.into(),
        }
    }
}
