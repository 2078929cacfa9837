//! Channel identifier type
//!
//! `ChannelId` indexes the channel list owned by a selector.

use std::fmt;

/// Index of a channel inside a selector
///
/// Ids are assigned sequentially as channels are registered with a
/// [`SelectorBuilder`](crate::SelectorBuilder) and are only meaningful for
/// the selector built from it.
///
/// ```
/// use spool_routing::ChannelId;
///
/// let id = ChannelId::new(0);
/// let copy = id;
/// assert_eq!(id, copy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u16);

impl ChannelId {
    /// Maximum number of channels a selector can address
    pub const MAX: u16 = u16::MAX;

    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Get the index as usize (for slice indexing)
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel:{}", self.0)
    }
}

impl From<u16> for ChannelId {
    #[inline]
    fn from(index: u16) -> Self {
        Self::new(index)
    }
}

impl From<ChannelId> for usize {
    #[inline]
    fn from(id: ChannelId) -> Self {
        id.0 as usize
    }
}
