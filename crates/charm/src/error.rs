//! Error types for the operator core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for operator core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Operator core error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read state file '{path}': {reason}")]
    StoreReadFailed { path: PathBuf, reason: String },

    #[error("failed to write state file '{path}': {reason}")]
    StoreWriteFailed { path: PathBuf, reason: String },

    #[error("unknown hook '{hook}'")]
    UnknownHook { hook: String },
}

impl Error {
    /// Create a store read error.
    pub fn store_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a store write error.
    pub fn store_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown hook error.
    pub fn unknown_hook(hook: impl Into<String>) -> Self {
        Self::UnknownHook { hook: hook.into() }
    }
}
