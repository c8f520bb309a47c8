//! Reconciliation state machine.
//!
//! Drives the supervisor toward the desired configuration and owns the
//! single unit-status variable. One pass runs per signal, to completion or
//! to the first failing step; the status is written only at the points
//! documented on [`Reconciler::apply_layer`].

use katib_pebble::{Error as PebbleError, PebbleClient};
use tracing::{debug, info, warn};

use crate::config::DesiredConfig;
use crate::status::UnitStatus;

/// Status reason while the supervisor endpoint is unreachable.
pub const WAITING_FOR_PEBBLE: &str = "Waiting for Pebble";

/// Status reason while a pass is in flight.
pub const APPLYING_CONFIG: &str = "applying config";

/// Lifecycle phase of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has happened yet.
    Uninitialized,
    /// Interface negotiation is in progress.
    Negotiating,
    /// Negotiation failed; the loop is gated shut until an external
    /// restart re-attempts it. No internal retry timer exists.
    Gated,
    /// Negotiation succeeded; the loop processes signals indefinitely.
    Ready,
}

/// The reconciler: owns the unit status and applies layers.
#[derive(Debug)]
pub struct Reconciler {
    status: UnitStatus,
    phase: Phase,
}

impl Reconciler {
    /// Create a reconciler in its initial state.
    pub fn new() -> Self {
        Self {
            status: UnitStatus::Maintenance("initializing".to_string()),
            phase: Phase::Uninitialized,
        }
    }

    /// Current unit status.
    pub fn status(&self) -> &UnitStatus {
        &self.status
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Enter the negotiating phase.
    pub fn begin_negotiation(&mut self) {
        self.phase = Phase::Negotiating;
    }

    /// Gate the loop shut with the given status (Waiting or Blocked).
    ///
    /// The status holds until the source condition clears; a later
    /// successful pass cannot overwrite it because no pass runs while
    /// gated.
    pub fn gate(&mut self, status: UnitStatus) {
        warn!(status = %status, "reconciliation loop gated");
        self.phase = Phase::Gated;
        self.status = status;
    }

    /// Mark negotiation as successful and the loop as live.
    pub fn mark_ready(&mut self) {
        self.phase = Phase::Ready;
        self.status = UnitStatus::Active;
    }

    /// One reconciliation pass: drive the supervisor toward `desired`.
    ///
    /// Status writes, in order:
    /// 1. Maintenance("applying config") before any I/O
    /// 2. Waiting("Waiting for Pebble") if the endpoint is unreachable at
    ///    any step, aborting the remaining steps
    /// 3. Blocked(reason) if the endpoint answered but rejected a step
    /// 4. Active once layer apply, stop-if-running, and start all succeed
    ///
    /// Re-entrant: every invocation recomputes the descriptor and relies
    /// on the supervisor's combine semantics; no diffing against prior
    /// calls.
    pub async fn apply_layer(
        &mut self,
        supervisor: &dyn PebbleClient,
        desired: &DesiredConfig,
    ) -> UnitStatus {
        self.status = UnitStatus::Maintenance(APPLYING_CONFIG.to_string());

        let name = desired.service_name.as_str();
        let layer = desired.layer();
        debug!(service = name, port = desired.port, "applying layer");

        if let Err(e) = supervisor.add_layer(name, layer, true).await {
            return self.fail_pass("add layer", &e);
        }

        // A running service with stale configuration must not be left
        // running; stopping guarantees the next start picks up the new
        // command and environment.
        match supervisor.get_service(name).await {
            Ok(info) if info.is_running() => {
                if let Err(e) = supervisor.stop(name).await {
                    return self.fail_pass("stop service", &e);
                }
            }
            Ok(_) => {}
            // The first pass races layer creation; an unknown service is
            // simply not running yet.
            Err(PebbleError::ServiceNotFound { .. }) => {}
            Err(e) => return self.fail_pass("query run state", &e),
        }

        if let Err(e) = supervisor.start(name).await {
            return self.fail_pass("start service", &e);
        }

        info!(service = name, port = desired.port, "layer applied");
        self.status = UnitStatus::Active;
        self.status.clone()
    }

    fn fail_pass(&mut self, step: &str, error: &PebbleError) -> UnitStatus {
        self.status = if error.is_unreachable() {
            warn!(step, error = %error, "supervisor unreachable, aborting pass");
            UnitStatus::Waiting(WAITING_FOR_PEBBLE.to_string())
        } else {
            warn!(step, error = %error, "supervisor rejected step");
            UnitStatus::Blocked(format!("{step} failed: {error}"))
        };
        self.status.clone()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, CharmConfig, NAMESPACE_ENV, SERVICE_NAME};
    use katib_pebble::{FailPoint, InMemoryPebble, PebbleCall, ServiceRunState};

    fn desired(port: u16) -> DesiredConfig {
        resolve(&CharmConfig { port }, "ns1")
    }

    #[tokio::test]
    async fn test_successful_pass_is_active() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        let status = reconciler.apply_layer(&pebble, &desired(8080)).await;
        assert_eq!(status, UnitStatus::Active);

        let spec = pebble
            .layer(SERVICE_NAME)
            .await
            .and_then(|l| l.service(SERVICE_NAME).cloned());
        assert_eq!(
            spec.as_ref().map(|s| s.command.as_str()),
            Some("./katib-ui --port=8080")
        );
        assert_eq!(
            spec.and_then(|s| s.environment.get(NAMESPACE_ENV).cloned()),
            Some("ns1".to_string())
        );
    }

    #[tokio::test]
    async fn test_unreachable_add_layer_waits_without_stop_start() {
        let pebble = InMemoryPebble::new();
        pebble.fail_at(FailPoint::AddLayer).await;
        let mut reconciler = Reconciler::new();

        let status = reconciler.apply_layer(&pebble, &desired(8080)).await;
        assert_eq!(
            status,
            UnitStatus::Waiting(WAITING_FOR_PEBBLE.to_string())
        );
        assert!(pebble.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_run_state_query_waits_without_start() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        // First pass succeeds so the layer exists, then the endpoint
        // drops at the query step.
        let _ = reconciler.apply_layer(&pebble, &desired(8080)).await;
        pebble.fail_at(FailPoint::GetService).await;

        let status = reconciler.apply_layer(&pebble, &desired(8080)).await;
        assert_eq!(
            status,
            UnitStatus::Waiting(WAITING_FOR_PEBBLE.to_string())
        );

        let starts_after_failure = pebble
            .calls()
            .await
            .iter()
            .filter(|c| matches!(c, PebbleCall::Start { .. }))
            .count();
        // Only the first, successful pass started the service.
        assert_eq!(starts_after_failure, 1);
    }

    #[tokio::test]
    async fn test_running_service_is_stopped_before_start() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        let _ = reconciler.apply_layer(&pebble, &desired(8080)).await;
        pebble.set_run_state(SERVICE_NAME, ServiceRunState::Running).await;

        let status = reconciler.apply_layer(&pebble, &desired(8081)).await;
        assert_eq!(status, UnitStatus::Active);

        let calls = pebble.calls().await;
        let stop_at = calls
            .iter()
            .position(|c| matches!(c, PebbleCall::Stop { .. }));
        let last_start_at = calls
            .iter()
            .rposition(|c| matches!(c, PebbleCall::Start { .. }));
        assert!(stop_at.is_some());
        assert!(stop_at < last_start_at);
    }

    #[tokio::test]
    async fn test_port_change_leaves_no_residual_descriptor() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        let _ = reconciler.apply_layer(&pebble, &desired(8080)).await;
        let _ = reconciler.apply_layer(&pebble, &desired(9090)).await;

        let layer = pebble.layer(SERVICE_NAME).await;
        let command = layer
            .as_ref()
            .and_then(|l| l.service(SERVICE_NAME).map(|s| s.command.clone()));
        assert_eq!(command.as_deref(), Some("./katib-ui --port=9090"));

        let residual = layer
            .map(|l| {
                l.services
                    .values()
                    .any(|s| s.command.contains("--port=8080"))
            })
            .unwrap_or(true);
        assert!(!residual);
    }

    #[tokio::test]
    async fn test_identical_passes_are_idempotent() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        let first = reconciler.apply_layer(&pebble, &desired(8080)).await;
        let after_first = pebble.layer(SERVICE_NAME).await;

        let second = reconciler.apply_layer(&pebble, &desired(8080)).await;
        let after_second = pebble.layer(SERVICE_NAME).await;

        assert_eq!(first, second);
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_api_rejection_blocks() {
        let pebble = InMemoryPebble::new();
        let mut reconciler = Reconciler::new();

        // Start fails with an API error when the service was never
        // defined; simulate by starting against an endpoint whose layer
        // add is skipped via a non-connection failure path.
        let status = reconciler
            .apply_layer(
                &RejectingPebble::default(),
                &desired(8080),
            )
            .await;
        assert!(matches!(status, UnitStatus::Blocked(_)));
    }

    /// Pebble double whose add_layer answers but rejects the request.
    #[derive(Default)]
    struct RejectingPebble;

    #[async_trait::async_trait]
    impl PebbleClient for RejectingPebble {
        async fn add_layer(
            &self,
            _label: &str,
            _layer: katib_pebble::Layer,
            _combine: bool,
        ) -> katib_pebble::Result<()> {
            Err(PebbleError::api("layer rejected"))
        }

        async fn get_service(
            &self,
            name: &str,
        ) -> katib_pebble::Result<katib_pebble::ServiceInfo> {
            Err(PebbleError::service_not_found(name))
        }

        async fn start(&self, _name: &str) -> katib_pebble::Result<()> {
            Ok(())
        }

        async fn stop(&self, _name: &str) -> katib_pebble::Result<()> {
            Ok(())
        }
    }
}
