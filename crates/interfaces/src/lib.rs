//! Versioned relation interfaces for the operator.
//!
//! A relation is a named data-exchange channel to a peer component. Before
//! any channel is used, both sides must agree on a version:
//!
//! 1. The remote side lists the versions it speaks through relation data
//! 2. [`Negotiator::negotiate`] checks that list against the locally
//!    supported versions, in local preference order
//! 3. The outcome is an [`InterfaceSet`] of negotiated handles, or a
//!    tagged error the caller maps onto a unit status
//!
//! The severity distinction is deliberate: an empty remote list is
//! retryable (the far side just has not published yet), an incompatible
//! list is durable until the remote relation is fixed.
//!
//! [`ingress::publish`] sends the canonical routing descriptor to the
//! negotiated ingress peer; it is a no-op when the handle is absent.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod ingress;
pub mod negotiate;
pub mod relation;

pub use error::{Error, Result};
pub use ingress::{publish, IngressDescriptor, INGRESS_INTERFACE};
pub use negotiate::{InterfaceDecl, InterfaceSet, NegotiatedInterface, Negotiator};
pub use relation::{InMemoryRelations, RelationBackend};
