//! Pebble supervisor client contract.
//!
//! This crate abstracts the in-pod process-supervision API consumed by the
//! operator core:
//!
//! - **Layer**: a named, declarative service definition (command,
//!   environment, startup policy), mergeable with prior layers by name
//! - **Run state**: queried fresh on every pass, never cached
//! - **Client trait**: add layer, query service, start, stop — every call
//!   returns a tagged result where connection-level failure is a
//!   distinguished [`Error::Unreachable`] variant
//!
//! The core depends only on [`PebbleClient`]; [`InMemoryPebble`] is the
//! call-recording implementation used by tests.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod client;
pub mod error;
pub mod layer;

pub use client::{FailPoint, InMemoryPebble, PebbleCall, PebbleClient, ServiceInfo, ServiceRunState};
pub use error::{Error, Result};
pub use layer::{Layer, Override, ServiceSpec, Startup};
