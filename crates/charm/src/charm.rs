//! Top-level charm: wiring, startup negotiation, and signal handling.

use std::sync::Arc;

use katib_interfaces::{
    publish, IngressDescriptor, InterfaceSet, Negotiator, RelationBackend, INGRESS_INTERFACE,
};
use katib_pebble::PebbleClient;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{resolve, CharmConfig, DesiredConfig};
use crate::dispatch::{DispatchTable, Signal};
use crate::reconciler::Reconciler;
use crate::status::UnitStatus;
use crate::store::StoredState;

/// Ingress schema versions this unit supports, most preferred first.
pub const SUPPORTED_INGRESS_VERSIONS: &[&str] = &["v3", "v2"];

/// Key under which the last reported status is persisted.
pub const LAST_STATUS_KEY: &str = "last_status";

/// The operational controller for the katib-ui sidecar.
///
/// Owns the desired configuration, the reconciler, the observation table,
/// and the negotiated interface set. Exactly one signal is processed to
/// completion before the next is accepted.
pub struct Charm {
    config: CharmConfig,
    namespace: String,
    desired: DesiredConfig,
    reconciler: Reconciler,
    dispatch: DispatchTable,
    interfaces: InterfaceSet,
    pebble: Arc<dyn PebbleClient>,
    relations: Arc<dyn RelationBackend>,
    stored: StoredState,
}

impl Charm {
    /// Construct the charm and run startup negotiation.
    ///
    /// Negotiation gates the event loop: on a retryable failure the unit
    /// waits (a later restart re-attempts — there is no internal retry
    /// timer), on an incompatible version list it blocks, and on success
    /// the observation table is built and the loop is live.
    pub async fn startup(
        config: CharmConfig,
        namespace: impl Into<String>,
        pebble: Arc<dyn PebbleClient>,
        relations: Arc<dyn RelationBackend>,
        stored: StoredState,
    ) -> Self {
        let namespace = namespace.into();
        let desired = resolve(&config, &namespace);

        let mut reconciler = Reconciler::new();
        let mut dispatch = DispatchTable::empty();

        reconciler.begin_negotiation();
        let negotiator = Negotiator::new(relations.clone()).declare(
            INGRESS_INTERFACE,
            SUPPORTED_INGRESS_VERSIONS
                .iter()
                .map(|v| (*v).to_string())
                .collect(),
        );

        let interfaces = match negotiator.negotiate().await {
            Ok(set) => {
                info!(interfaces = set.len(), "negotiation complete, loop live");
                reconciler.mark_ready();
                dispatch.observe(Signal::WorkloadReady);
                dispatch.observe(Signal::ConfigChanged);
                dispatch.observe(Signal::IngressChanged);
                set
            }
            Err(e) if e.is_retryable() => {
                reconciler.gate(UnitStatus::Waiting(e.to_string()));
                InterfaceSet::empty()
            }
            Err(e) => {
                reconciler.gate(UnitStatus::Blocked(e.to_string()));
                InterfaceSet::empty()
            }
        };

        Self {
            config,
            namespace,
            desired,
            reconciler,
            dispatch,
            interfaces,
            pebble,
            relations,
            stored,
        }
    }

    /// Current unit status.
    pub fn status(&self) -> &UnitStatus {
        self.reconciler.status()
    }

    /// The observation table built at startup.
    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// The negotiated interface set.
    pub fn interfaces(&self) -> &InterfaceSet {
        &self.interfaces
    }

    /// The persisted cross-signal store.
    pub fn stored(&self) -> &StoredState {
        &self.stored
    }

    /// Replace the raw config, as delivered alongside a config-changed
    /// signal. The desired configuration is recomputed inside the handler,
    /// never here.
    pub fn update_config(&mut self, config: CharmConfig) {
        self.config = config;
    }

    /// Deliver one signal and run its handler to completion.
    ///
    /// Unobserved signals (a gated loop, or a hook the charm never
    /// registered) are no-ops that leave the status untouched. No failure
    /// escapes this method; every outcome is a status value.
    pub async fn handle(&mut self, signal: Signal) -> UnitStatus {
        if !self.dispatch.is_observed(signal) {
            debug!(hook = signal.hook_name(), "signal not observed, ignoring");
            return self.reconciler.status().clone();
        }

        let status = match signal {
            Signal::WorkloadReady => self.on_workload_ready().await,
            Signal::ConfigChanged => self.on_config_changed().await,
            Signal::IngressChanged => self.on_ingress_changed().await,
        };

        self.persist_status(&status);
        status
    }

    async fn on_workload_ready(&mut self) -> UnitStatus {
        let status = self
            .reconciler
            .apply_layer(self.pebble.as_ref(), &self.desired)
            .await;
        if status == UnitStatus::Active {
            self.post_start_provisioning().await;
        }
        status
    }

    async fn on_config_changed(&mut self) -> UnitStatus {
        self.desired = resolve(&self.config, &self.namespace);
        debug!(port = self.desired.port, "port reconfigured");
        self.reconciler
            .apply_layer(self.pebble.as_ref(), &self.desired)
            .await
    }

    async fn on_ingress_changed(&mut self) -> UnitStatus {
        // Recomputed from current config on every publish, never memoized.
        let descriptor =
            IngressDescriptor::for_service(self.desired.service_name.clone(), self.desired.port);

        // Fire-and-forget: delivery guarantees belong to the transport, so
        // a send failure is logged but does not change the unit status.
        if let Err(e) = publish(self.relations.as_ref(), &self.interfaces, &descriptor).await {
            warn!(error = %e, "ingress publish failed");
        }
        self.reconciler.status().clone()
    }

    /// One-time post-start provisioning extension point.
    ///
    /// Concrete provisioning steps (credentials, service accounts) are out
    /// of scope; the marker in the store keeps the step one-time across
    /// restarts.
    async fn post_start_provisioning(&mut self) {
        if self.stored.get("provisioned").is_some() {
            return;
        }
        debug!("running post-start provisioning");
        if let Err(e) = self.stored.set("provisioned", json!(true)) {
            warn!(error = %e, "failed to persist provisioning marker");
        }
    }

    fn persist_status(&mut self, status: &UnitStatus) {
        if let Err(e) = self.stored.set(LAST_STATUS_KEY, json!(status.to_string())) {
            warn!(error = %e, "failed to persist status");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::config::SERVICE_NAME;
    use crate::reconciler::{Phase, WAITING_FOR_PEBBLE};
    use katib_interfaces::InMemoryRelations;
    use katib_pebble::{FailPoint, InMemoryPebble};

    static STORE_SEQ: AtomicU32 = AtomicU32::new(0);

    fn store() -> StoredState {
        let seq = STORE_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "katib-charm-test-{}-{seq}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        StoredState::load(path).unwrap()
    }

    async fn ready_charm(pebble: Arc<InMemoryPebble>) -> (Charm, Arc<InMemoryRelations>) {
        let relations = InMemoryRelations::new_arc();
        relations
            .set_remote_versions(INGRESS_INTERFACE, vec!["v3".to_string()])
            .await;
        let charm = Charm::startup(
            CharmConfig { port: 8080 },
            "ns1",
            pebble,
            relations.clone(),
            store(),
        )
        .await;
        (charm, relations)
    }

    #[tokio::test]
    async fn test_no_versions_gates_waiting_with_no_observers() {
        let charm = Charm::startup(
            CharmConfig::default(),
            "ns1",
            InMemoryPebble::new_arc(),
            InMemoryRelations::new_arc(),
            store(),
        )
        .await;

        assert!(matches!(charm.status(), UnitStatus::Waiting(_)));
        assert!(charm.dispatch_table().is_empty());
        assert!(charm.interfaces().is_empty());
    }

    #[tokio::test]
    async fn test_incompatible_versions_gates_blocked_with_no_observers() {
        let relations = InMemoryRelations::new_arc();
        relations
            .set_remote_versions(INGRESS_INTERFACE, vec!["v99".to_string()])
            .await;

        let charm = Charm::startup(
            CharmConfig::default(),
            "ns1",
            InMemoryPebble::new_arc(),
            relations,
            store(),
        )
        .await;

        assert!(matches!(charm.status(), UnitStatus::Blocked(_)));
        assert!(charm.dispatch_table().is_empty());
    }

    #[tokio::test]
    async fn test_successful_negotiation_registers_each_observer_once() {
        let (charm, _) = ready_charm(InMemoryPebble::new_arc()).await;

        assert_eq!(charm.status(), &UnitStatus::Active);
        assert_eq!(charm.dispatch_table().len(), 3);
        let ingress_observers = charm
            .dispatch_table()
            .observers()
            .iter()
            .filter(|s| **s == Signal::IngressChanged)
            .count();
        assert_eq!(ingress_observers, 1);
    }

    #[tokio::test]
    async fn test_gated_charm_ignores_signals() {
        let pebble = InMemoryPebble::new_arc();
        let mut charm = Charm::startup(
            CharmConfig::default(),
            "ns1",
            pebble.clone(),
            InMemoryRelations::new_arc(),
            store(),
        )
        .await;

        let before = charm.status().clone();
        let after = charm.handle(Signal::WorkloadReady).await;

        assert_eq!(before, after);
        assert!(pebble.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_workload_ready_applies_layer_and_goes_active() {
        let pebble = InMemoryPebble::new_arc();
        let (mut charm, _) = ready_charm(pebble.clone()).await;

        let status = charm.handle(Signal::WorkloadReady).await;
        assert_eq!(status, UnitStatus::Active);

        let command = pebble
            .layer(SERVICE_NAME)
            .await
            .and_then(|l| l.service(SERVICE_NAME).map(|s| s.command.clone()));
        assert_eq!(command.as_deref(), Some("./katib-ui --port=8080"));
    }

    #[tokio::test]
    async fn test_workload_ready_with_unreachable_pebble_waits() {
        let pebble = InMemoryPebble::new_arc();
        pebble.fail_at(FailPoint::AddLayer).await;
        let (mut charm, _) = ready_charm(pebble).await;

        let status = charm.handle(Signal::WorkloadReady).await;
        assert_eq!(
            status,
            UnitStatus::Waiting(WAITING_FOR_PEBBLE.to_string())
        );
    }

    #[tokio::test]
    async fn test_config_change_reapplies_with_new_port() {
        let pebble = InMemoryPebble::new_arc();
        let (mut charm, _) = ready_charm(pebble.clone()).await;

        let _ = charm.handle(Signal::WorkloadReady).await;
        charm.update_config(CharmConfig { port: 9090 });
        let status = charm.handle(Signal::ConfigChanged).await;

        assert_eq!(status, UnitStatus::Active);
        let command = pebble
            .layer(SERVICE_NAME)
            .await
            .and_then(|l| l.service(SERVICE_NAME).map(|s| s.command.clone()));
        assert_eq!(command.as_deref(), Some("./katib-ui --port=9090"));
    }

    #[tokio::test]
    async fn test_ingress_changed_publishes_descriptor() {
        let (mut charm, relations) = ready_charm(InMemoryPebble::new_arc()).await;

        let _ = charm.handle(Signal::IngressChanged).await;

        let sent = relations.sent().await;
        assert_eq!(sent.len(), 1);
        let payload = sent.first().map(|(_, p)| p.clone());
        assert_eq!(
            payload
                .as_ref()
                .and_then(|p| p.get("prefix"))
                .and_then(|v| v.as_str()),
            Some("/katib-ui/")
        );
    }

    #[tokio::test]
    async fn test_ingress_changed_republishes_unchanged_descriptor() {
        let (mut charm, relations) = ready_charm(InMemoryPebble::new_arc()).await;

        let _ = charm.handle(Signal::IngressChanged).await;
        let _ = charm.handle(Signal::IngressChanged).await;

        // Receiver deduplicates; the publisher must re-send every time.
        assert_eq!(relations.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn test_status_is_persisted_after_each_handled_signal() {
        let (mut charm, _) = ready_charm(InMemoryPebble::new_arc()).await;

        let _ = charm.handle(Signal::WorkloadReady).await;

        assert_eq!(
            charm.stored().get(LAST_STATUS_KEY).cloned(),
            Some(json!("active"))
        );
    }

    #[test]
    fn test_phase_transitions_are_explicit() {
        let mut reconciler = Reconciler::new();
        assert_eq!(reconciler.phase(), Phase::Uninitialized);

        reconciler.begin_negotiation();
        assert_eq!(reconciler.phase(), Phase::Negotiating);

        reconciler.mark_ready();
        assert_eq!(reconciler.phase(), Phase::Ready);
    }
}
