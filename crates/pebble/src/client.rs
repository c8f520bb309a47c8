//! Pebble client trait and implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::layer::Layer;

/// Run state of a supervised service.
///
/// Always re-queried, never cached across reconciliation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRunState {
    /// State could not be determined.
    Unknown,
    /// Service is defined but not running.
    Stopped,
    /// Service is running.
    Running,
}

/// Snapshot of one service as reported by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Current run state.
    pub current: ServiceRunState,
}

impl ServiceInfo {
    /// Whether the service is currently running.
    pub fn is_running(&self) -> bool {
        self.current == ServiceRunState::Running
    }
}

/// Trait for the process-supervision API.
///
/// Every call returns a tagged result; connection-level failure surfaces
/// as [`Error::Unreachable`] and handlers branch on the tag.
#[async_trait]
pub trait PebbleClient: Send + Sync {
    /// Apply a layer under the given label.
    ///
    /// With `combine`, an identical layer is a no-op and a changed service
    /// definition fully replaces the prior one under that name.
    async fn add_layer(&self, label: &str, layer: Layer, combine: bool) -> Result<()>;

    /// Query the current state of a service.
    async fn get_service(&self, name: &str) -> Result<ServiceInfo>;

    /// Start a service.
    async fn start(&self, name: &str) -> Result<()>;

    /// Stop a service.
    async fn stop(&self, name: &str) -> Result<()>;
}

/// A recorded client call, for asserting call ordering in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PebbleCall {
    /// `add_layer` was invoked with this label.
    AddLayer { label: String },
    /// `get_service` was invoked for this service.
    GetService { name: String },
    /// `start` was invoked for this service.
    Start { name: String },
    /// `stop` was invoked for this service.
    Stop { name: String },
}

/// Operation at which the in-memory client simulates an unreachable
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    AddLayer,
    GetService,
    Start,
    Stop,
}

/// In-memory Pebble client for testing.
///
/// Records every call, honors combine semantics on layers, and can be
/// armed to report the endpoint as unreachable at a chosen operation.
#[derive(Default)]
pub struct InMemoryPebble {
    layers: RwLock<HashMap<String, Layer>>,
    run_states: RwLock<HashMap<String, ServiceRunState>>,
    calls: RwLock<Vec<PebbleCall>>,
    fail_point: RwLock<Option<FailPoint>>,
}

impl InMemoryPebble {
    /// Create a new in-memory client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory client wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Arm a fail point: the given operation reports the endpoint as
    /// unreachable until cleared.
    pub async fn fail_at(&self, point: FailPoint) {
        *self.fail_point.write().await = Some(point);
    }

    /// Clear any armed fail point.
    pub async fn clear_failure(&self) {
        *self.fail_point.write().await = None;
    }

    /// Force the recorded run state of a service.
    pub async fn set_run_state(&self, name: impl Into<String>, state: ServiceRunState) {
        self.run_states.write().await.insert(name.into(), state);
    }

    /// Snapshot of all calls made so far, in order.
    pub async fn calls(&self) -> Vec<PebbleCall> {
        self.calls.read().await.clone()
    }

    /// The layer currently applied under a label, if any.
    pub async fn layer(&self, label: &str) -> Option<Layer> {
        self.layers.read().await.get(label).cloned()
    }

    async fn check(&self, point: FailPoint) -> Result<()> {
        if *self.fail_point.read().await == Some(point) {
            return Err(Error::unreachable("connection refused"));
        }
        Ok(())
    }

    async fn record(&self, call: PebbleCall) {
        self.calls.write().await.push(call);
    }

    async fn service_defined(&self, name: &str) -> bool {
        self.layers
            .read()
            .await
            .values()
            .any(|layer| layer.service(name).is_some())
    }
}

#[async_trait]
impl PebbleClient for InMemoryPebble {
    async fn add_layer(&self, label: &str, layer: Layer, combine: bool) -> Result<()> {
        self.check(FailPoint::AddLayer).await?;
        self.record(PebbleCall::AddLayer {
            label: label.to_string(),
        })
        .await;

        debug!(label, combine, "applying layer");

        let mut layers = self.layers.write().await;
        if combine {
            // Combine merges service-by-service; each service definition
            // under the same name is replaced wholesale.
            let entry = layers
                .entry(label.to_string())
                .or_insert_with(|| Layer::new(layer.summary.clone(), layer.description.clone()));
            for (name, spec) in layer.services {
                entry.services.insert(name, spec);
            }
        } else {
            layers.insert(label.to_string(), layer);
        }
        Ok(())
    }

    async fn get_service(&self, name: &str) -> Result<ServiceInfo> {
        self.check(FailPoint::GetService).await?;
        self.record(PebbleCall::GetService {
            name: name.to_string(),
        })
        .await;

        if !self.service_defined(name).await {
            return Err(Error::service_not_found(name));
        }

        let current = self
            .run_states
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(ServiceRunState::Stopped);

        Ok(ServiceInfo {
            name: name.to_string(),
            current,
        })
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.check(FailPoint::Start).await?;
        self.record(PebbleCall::Start {
            name: name.to_string(),
        })
        .await;

        if !self.service_defined(name).await {
            return Err(Error::service_not_found(name));
        }
        self.run_states
            .write()
            .await
            .insert(name.to_string(), ServiceRunState::Running);
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.check(FailPoint::Stop).await?;
        self.record(PebbleCall::Stop {
            name: name.to_string(),
        })
        .await;

        self.run_states
            .write()
            .await
            .insert(name.to_string(), ServiceRunState::Stopped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::ServiceSpec;

    fn ui_layer(command: &str) -> Layer {
        Layer::new("ui layer", "config layer for the ui")
            .with_service("ui", ServiceSpec::new("ui", command))
    }

    #[tokio::test]
    async fn test_combine_replaces_service_definition() {
        let pebble = InMemoryPebble::new();

        let first = pebble.add_layer("ui", ui_layer("./ui --port=1"), true).await;
        assert!(first.is_ok());
        let second = pebble.add_layer("ui", ui_layer("./ui --port=2"), true).await;
        assert!(second.is_ok());

        let command = pebble
            .layer("ui")
            .await
            .and_then(|l| l.service("ui").map(|s| s.command.clone()));
        assert_eq!(command.as_deref(), Some("./ui --port=2"));
    }

    #[tokio::test]
    async fn test_reapplying_identical_layer_is_noop() {
        let pebble = InMemoryPebble::new();

        let _ = pebble.add_layer("ui", ui_layer("./ui --port=1"), true).await;
        let before = pebble.layer("ui").await;
        let _ = pebble.add_layer("ui", ui_layer("./ui --port=1"), true).await;
        let after = pebble.layer("ui").await;

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_fail_point_reports_unreachable() {
        let pebble = InMemoryPebble::new();
        pebble.fail_at(FailPoint::AddLayer).await;

        let result = pebble.add_layer("ui", ui_layer("./ui"), true).await;
        assert!(matches!(result, Err(Error::Unreachable { .. })));

        // A fail point blocks before the call is recorded.
        assert!(pebble.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_service_unknown_name() {
        let pebble = InMemoryPebble::new();
        let result = pebble.get_service("ghost").await;
        assert!(matches!(result, Err(Error::ServiceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_start_then_query_reports_running() {
        let pebble = InMemoryPebble::new();
        let _ = pebble.add_layer("ui", ui_layer("./ui"), true).await;
        let _ = pebble.start("ui").await;

        let info = pebble.get_service("ui").await;
        assert!(info.map(|i| i.is_running()).unwrap_or(false));
    }

    #[tokio::test]
    async fn test_calls_are_recorded_in_order() {
        let pebble = InMemoryPebble::new();
        let _ = pebble.add_layer("ui", ui_layer("./ui"), true).await;
        let _ = pebble.start("ui").await;
        let _ = pebble.stop("ui").await;

        let calls = pebble.calls().await;
        assert_eq!(
            calls,
            vec![
                PebbleCall::AddLayer {
                    label: "ui".to_string()
                },
                PebbleCall::Start {
                    name: "ui".to_string()
                },
                PebbleCall::Stop {
                    name: "ui".to_string()
                },
            ]
        );
    }
}
