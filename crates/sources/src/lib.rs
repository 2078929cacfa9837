//! Spool Sources - Inbound collaborators
//!
//! Sources receive events from the outside world and hand them to a
//! `ChannelProcessor`. The reply sent back (`OK` / `FAILED`) reflects whether
//! every required channel committed.
//!
//! # Available Sources
//!
//! - **Rpc** - Embedded request handler: `append` / `append_batch` → `Status`
//! - **Line** - Newline-delimited events from any reader, one reply per line
//!
//! # Example
//!
//! ```ignore
//! use spool_sources::{LineSource, LineSourceConfig};
//!
//! let source = LineSource::new("stdin", processor, LineSourceConfig::default(), counters);
//! let stdin = std::io::stdin();
//! source.run(stdin.lock(), std::io::stdout())?;
//! ```

mod error;
mod line;
mod rpc;

pub use error::{Result, SourceError};
pub use line::{DEFAULT_MAX_LINE_LENGTH, LineSource, LineSourceConfig};
pub use rpc::RpcSource;
