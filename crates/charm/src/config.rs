//! Configuration resolution.
//!
//! Pure derivation of the canonical desired runtime configuration from the
//! raw config mapping and ambient identity values. No I/O, no error path:
//! port validity is the upstream collaborator's concern, and `resolve` is
//! safe to call repeatedly and on every signal.

use std::collections::HashMap;

use katib_pebble::{Layer, ServiceSpec};
use serde::{Deserialize, Serialize};

/// Name of the managed service inside the workload container.
pub const SERVICE_NAME: &str = "katib-ui";

/// Default workload port when config does not override it.
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable carrying the pod namespace to the workload.
pub const NAMESPACE_ENV: &str = "KUBERNETES_POD_NAMESPACE";

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Raw config mapping as delivered by the orchestrator.
///
/// A config-changed signal fires only when at least one value actually
/// changed; repeated identical values do not re-fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharmConfig {
    /// Port the workload listens on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Canonical desired runtime configuration for one reconciliation pass.
///
/// Immutable once computed for a pass; recomputed on every config-changed
/// signal, so the port is never stale across a completed reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfig {
    /// Workload port.
    pub port: u16,
    /// Pod namespace the unit runs in.
    pub namespace: String,
    /// Managed service name.
    pub service_name: String,
}

/// Derive the desired configuration from raw inputs.
pub fn resolve(config: &CharmConfig, pod_namespace: &str) -> DesiredConfig {
    DesiredConfig {
        port: config.port,
        namespace: pod_namespace.to_string(),
        service_name: SERVICE_NAME.to_string(),
    }
}

impl DesiredConfig {
    /// Command line for the workload, embedding the current port.
    pub fn command(&self) -> String {
        format!("./{} --port={}", self.service_name, self.port)
    }

    /// Environment passed to the workload process.
    pub fn environment(&self) -> HashMap<String, String> {
        HashMap::from([(NAMESPACE_ENV.to_string(), self.namespace.clone())])
    }

    /// Build the layer descriptor for this configuration.
    ///
    /// A pure value, constructed fresh each reconciliation pass and
    /// reapplied wholesale.
    pub fn layer(&self) -> Layer {
        Layer::new(
            format!("{} layer", self.service_name),
            format!("pebble config layer for {}", self.service_name),
        )
        .with_service(
            self.service_name.clone(),
            ServiceSpec::new(self.service_name.clone(), self.command())
                .with_environment(self.environment()),
        )
    }
}
