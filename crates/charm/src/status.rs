//! Unit status model.
//!
//! Exactly one status is externally visible at any observation point. The
//! precedence ordering Blocked > Waiting > Maintenance > Active is for
//! display purposes: a higher-precedence status set during negotiation is
//! not overwritten by a later successful reconciliation unless the source
//! condition clears.

use std::fmt;

/// Externally visible unit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// The unit is operating normally.
    Active,
    /// The unit is performing work; reconciliation is in progress.
    Maintenance(String),
    /// The unit is waiting on a condition that a retry can resolve.
    Waiting(String),
    /// The unit is stuck on a condition needing external intervention.
    Blocked(String),
}

impl UnitStatus {
    /// Display precedence; higher outranks lower.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Blocked(_) => 3,
            Self::Waiting(_) => 2,
            Self::Maintenance(_) => 1,
            Self::Active => 0,
        }
    }

    /// Whether this status outranks another for display.
    pub fn outranks(&self, other: &Self) -> bool {
        self.precedence() > other.precedence()
    }

    /// Stable status name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance(_) => "maintenance",
            Self::Waiting(_) => "waiting",
            Self::Blocked(_) => "blocked",
        }
    }

    /// Free-text reason, empty for Active.
    pub fn message(&self) -> &str {
        match self {
            Self::Active => "",
            Self::Maintenance(m) | Self::Waiting(m) | Self::Blocked(m) => m,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            other => write!(f, "{}: {}", other.name(), other.message()),
        }
    }
}
