//! Event type
//!
//! An `Event` is the atomic unit moved through the pipeline: a body of bytes
//! plus a map of string headers. Header order is irrelevant.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

/// Header map carried by every event
pub type Headers = HashMap<String, String>;

/// Immutable event: string headers plus an opaque byte body
///
/// # Example
///
/// ```
/// use spool_protocol::Event;
///
/// let event = Event::builder()
///     .header("type", "error")
///     .body("disk full")
///     .build();
///
/// assert_eq!(event.header("type"), Some("error"));
/// assert_eq!(event.body().as_ref(), b"disk full");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Event {
    headers: Headers,
    body: Bytes,
}

impl Event {
    /// Create an event with a body and no headers
    #[inline]
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Create an event from a body and a header map
    #[inline]
    pub fn with_body(body: impl Into<Bytes>, headers: Headers) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Start building an event
    #[inline]
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }

    /// All headers
    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Look up a single header value
    #[inline]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Event body
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body length in bytes
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consume the event, returning its headers and body
    #[inline]
    pub fn into_parts(self) -> (Headers, Bytes) {
        (self.headers, self.body)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Builder for [`Event`]
#[derive(Debug, Default)]
pub struct EventBuilder {
    headers: Headers,
    body: Bytes,
}

impl EventBuilder {
    /// Add or replace a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add every header from an iterator of pairs
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Finish the event
    pub fn build(self) -> Event {
        Event {
            headers: self.headers,
            body: self.body,
        }
    }
}
