//! Operator core for the katib-ui sidecar workload.
//!
//! The controller reconciles desired configuration (a network port, an
//! ingress path) against the live state of a Pebble-supervised process and
//! reports unit health as a single status value:
//!
//! 1. **Configuration Resolver** ([`config`]) derives the canonical
//!    desired configuration from the raw config mapping — pure, no I/O
//! 2. **Negotiation gate** ([`Charm::startup`]) version-checks the
//!    declared relation interfaces; failure gates the loop shut with
//!    Waiting (retryable) or Blocked (durable)
//! 3. **Reconciler** ([`reconciler`]) drives the supervisor toward the
//!    desired state: apply layer, stop a stale running service, start
//! 4. **Status** ([`status`]) maps every outcome onto one of
//!    Blocked > Waiting > Maintenance > Active
//!
//! One signal is processed to completion before the next; the core owns no
//! timers and no internal retries — all retry pressure is external signal
//! redelivery.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod charm;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod reconciler;
pub mod status;
pub mod store;

pub use charm::{Charm, LAST_STATUS_KEY, SUPPORTED_INGRESS_VERSIONS};
pub use config::{resolve, CharmConfig, DesiredConfig, DEFAULT_PORT, NAMESPACE_ENV, SERVICE_NAME};
pub use dispatch::{DispatchTable, Signal};
pub use error::{Error, Result};
pub use reconciler::{Phase, Reconciler, APPLYING_CONFIG, WAITING_FOR_PEBBLE};
pub use status::UnitStatus;
pub use store::StoredState;
