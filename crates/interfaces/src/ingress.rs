//! Ingress descriptor and publisher.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::negotiate::InterfaceSet;
use crate::relation::RelationBackend;

/// Well-known name of the ingress interface.
pub const INGRESS_INTERFACE: &str = "ingress";

/// Routing descriptor sent to the ingress provider.
///
/// Recomputed from current config on every publish, never memoized; the
/// receiver is responsible for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressDescriptor {
    /// URL prefix routed to the service.
    pub prefix: String,
    /// Backend service name.
    pub service: String,
    /// Backend service port.
    pub port: u16,
}

impl IngressDescriptor {
    /// Build the canonical descriptor for a service: prefix `/<service>/`.
    pub fn for_service(service: impl Into<String>, port: u16) -> Self {
        let service = service.into();
        Self {
            prefix: format!("/{service}/"),
            service,
            port,
        }
    }
}

/// Publish the descriptor to the negotiated ingress interface.
///
/// No-op when the ingress handle is absent. Returns whether a payload was
/// actually sent.
///
/// # Errors
///
/// Returns a transport or serialization error; the caller converts it to a
/// status at the handler boundary.
pub async fn publish(
    backend: &dyn RelationBackend,
    interfaces: &InterfaceSet,
    descriptor: &IngressDescriptor,
) -> Result<bool> {
    let Some(handle) = interfaces.get(INGRESS_INTERFACE) else {
        debug!("ingress interface absent, skipping publish");
        return Ok(false);
    };

    let payload = serde_json::to_value(descriptor)
        .map_err(|e| Error::serialization(e.to_string()))?;

    backend.send(INGRESS_INTERFACE, payload).await?;
    info!(
        version = %handle.version,
        prefix = %descriptor.prefix,
        port = descriptor.port,
        "published ingress descriptor"
    );
    Ok(true)
}
