//! Signal kinds and the observation table.
//!
//! The orchestrator delivers signals; the charm decides at startup which
//! of them it observes. The table is built exactly once, gated by the
//! negotiation outcome: a gated charm observes nothing and every delivered
//! signal is a no-op.

use crate::error::{Error, Result};

/// Signal kinds delivered by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The supervisor endpoint became reachable (fires at most once).
    WorkloadReady,
    /// At least one config value actually changed.
    ConfigChanged,
    /// Relation data on the ingress relation changed.
    IngressChanged,
}

impl Signal {
    /// Hook name used by the orchestrator for this signal.
    pub fn hook_name(&self) -> &'static str {
        match self {
            Self::WorkloadReady => "katib-ui-pebble-ready",
            Self::ConfigChanged => "config-changed",
            Self::IngressChanged => "ingress-relation-changed",
        }
    }

    /// Parse a hook name into a signal kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHook`] for any other name.
    pub fn from_hook(hook: &str) -> Result<Self> {
        match hook {
            "katib-ui-pebble-ready" => Ok(Self::WorkloadReady),
            "config-changed" => Ok(Self::ConfigChanged),
            "ingress-relation-changed" => Ok(Self::IngressChanged),
            other => Err(Error::unknown_hook(other)),
        }
    }
}

/// Explicit table of observed signals.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    observed: Vec<Signal>,
}

impl DispatchTable {
    /// Create an empty table (the gated-shut state).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register an observer for a signal. Duplicate registrations are
    /// collapsed; each signal is observed at most once.
    pub fn observe(&mut self, signal: Signal) {
        if !self.observed.contains(&signal) {
            self.observed.push(signal);
        }
    }

    /// Whether a signal is observed.
    pub fn is_observed(&self, signal: Signal) -> bool {
        self.observed.contains(&signal)
    }

    /// The observed signals, in registration order.
    pub fn observers(&self) -> &[Signal] {
        &self.observed
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    /// Whether the table is gated shut.
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}
