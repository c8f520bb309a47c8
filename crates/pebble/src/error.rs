//! Error types for the Pebble client boundary.
//!
//! Connection-level failure is a distinguished variant, never an absence:
//! handlers branch on [`Error::is_unreachable`] rather than unwinding.

use thiserror::Error;

/// Result type alias for Pebble operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pebble client error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The supervision endpoint cannot be reached. Transient; expected to
    /// resolve once the container catches up.
    #[error("cannot connect to Pebble: {reason}")]
    Unreachable { reason: String },

    /// The named service is not part of any applied layer.
    #[error("service '{service}' not found")]
    ServiceNotFound { service: String },

    /// The endpoint answered but rejected the request.
    #[error("Pebble API error: {reason}")]
    Api { reason: String },
}

impl Error {
    /// Create an unreachable-endpoint error.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Create a service-not-found error.
    pub fn service_not_found(service: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service: service.into(),
        }
    }

    /// Create an API error.
    pub fn api(reason: impl Into<String>) -> Self {
        Self::Api {
            reason: reason.into(),
        }
    }

    /// Whether this error is a connection-level failure.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_is_tagged() {
        let err = Error::unreachable("connection refused");
        assert!(err.is_unreachable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_api_error_is_not_unreachable() {
        let err = Error::api("bad layer");
        assert!(!err.is_unreachable());
    }
}
