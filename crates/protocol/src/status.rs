//! Delivery status returned to inbound collaborators

use std::fmt;

/// Outcome of handing events to the pipeline
///
/// `Ok` is only returned once every required channel has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// All required channels committed the events
    Ok,
    /// At least one required channel rejected the events
    Failed,
}

impl Status {
    /// Wire representation (`OK` / `FAILED`)
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "FAILED",
        }
    }

    /// Whether delivery succeeded
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T, E> From<&Result<T, E>> for Status {
    fn from(result: &Result<T, E>) -> Self {
        if result.is_ok() { Self::Ok } else { Self::Failed }
    }
}
