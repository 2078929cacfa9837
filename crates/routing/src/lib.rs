//! Spool - Routing
//!
//! Channel selectors decide which channels must (required) or may
//! (optional) receive each event.
//!
//! # Design
//!
//! Channel names are resolved once, when a selector is built. Selectors hold
//! their channels in a `Vec` and answer routing queries with
//! `&[ChannelId]` slices into lists compiled at build time, so the per-event
//! path does no allocation and no name lookups.
//!
//! - [`ReplicatingSelector`]: every event goes to every channel
//! - [`MultiplexingSelector`]: a header value picks required and optional
//!   channels, with a default list when nothing matches
//!
//! # Example
//!
//! ```
//! use spool_channel::{Channel, ChannelConfig};
//! use spool_protocol::Event;
//! use spool_routing::{ChannelSelector, SelectorBuilder};
//!
//! let mut builder = SelectorBuilder::new();
//! builder.register_channel(Channel::new("errors", ChannelConfig::default())?);
//! builder.register_channel(Channel::new("all", ChannelConfig::default())?);
//!
//! let selector = builder
//!     .multiplexing("type")
//!     .map("error", ["errors"])
//!     .default_channels(["all"])
//!     .build()?;
//!
//! let event = Event::builder().header("type", "error").body("boom").build();
//! let required = selector.required_channels(&event);
//! assert_eq!(selector.channel(required[0]).map(|c| c.name()), Some("errors"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod channel_id;
mod error;
mod selector;


pub use builder::{MultiplexingBuilder, SelectorBuilder};
pub use channel_id::ChannelId;
pub use error::{Result, RoutingError};
pub use selector::{ChannelSelector, MultiplexingSelector, ReplicatingSelector};
