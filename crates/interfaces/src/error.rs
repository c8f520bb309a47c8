//! Error types for relation interface negotiation.
//!
//! The two negotiation failures are deliberately distinct: "no versions
//! listed yet" means a retry will help, "no compatible version" means it
//! will not without external intervention.

use std::fmt;

use itertools::Itertools;

/// Result type alias for interface operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Interface error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The remote side has not listed any versions yet.
    NoVersionsListed { interface: String },
    /// Versions are listed but none is compatible with ours.
    Incompatible {
        interface: String,
        remote: Vec<String>,
        supported: Vec<String>,
    },
    /// The relation-data transport failed.
    Transport { reason: String },
    /// A payload could not be serialized.
    Serialization { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVersionsListed { interface } => {
                write!(f, "no versions listed for interface '{interface}'")
            }
            Self::Incompatible {
                interface,
                remote,
                supported,
            } => {
                write!(
                    f,
                    "no compatible version for interface '{interface}' (remote: [{}], supported: [{}])",
                    remote.iter().join(", "),
                    supported.iter().join(", "),
                )
            }
            Self::Transport { reason } => {
                write!(f, "relation transport failed: {reason}")
            }
            Self::Serialization { reason } => {
                write!(f, "payload serialization failed: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a no-versions-listed error.
    pub fn no_versions_listed(interface: impl Into<String>) -> Self {
        Self::NoVersionsListed {
            interface: interface.into(),
        }
    }

    /// Create an incompatible-versions error.
    pub fn incompatible(
        interface: impl Into<String>,
        remote: Vec<String>,
        supported: Vec<String>,
    ) -> Self {
        Self::Incompatible {
            interface: interface.into(),
            remote,
            supported,
        }
    }

    /// Create a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Whether a later retry can resolve this error without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoVersionsListed { .. } | Self::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_versions_is_retryable() {
        let err = Error::no_versions_listed("ingress");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("ingress"));
    }

    #[test]
    fn test_incompatible_is_not_retryable() {
        let err = Error::incompatible(
            "ingress",
            vec!["v99".to_string()],
            vec!["v3".to_string()],
        );
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("v99"));
        assert!(err.to_string().contains("v3"));
    }
}
