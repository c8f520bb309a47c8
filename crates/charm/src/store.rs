//! Persisted key-value state.
//!
//! An opaque map-shaped scratch area surviving process restarts. The store
//! is initialized on first use with a documented empty default; no schema
//! is mandated beyond "map-shaped". Access is read-modify-write within one
//! signal handler only, never concurrent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// JSON-file-backed key-value store.
#[derive(Debug)]
pub struct StoredState {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl StoredState {
    /// Load the store from disk.
    ///
    /// A missing file yields the empty default; a present but unreadable
    /// or unparsable file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreReadFailed`] when the file exists but cannot
    /// be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            debug!(path = %path.display(), "state file absent, starting empty");
            return Ok(Self {
                path,
                values: HashMap::new(),
            });
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| Error::store_read_failed(&path, e.to_string()))?;
        let values = serde_json::from_str(&raw)
            .map_err(|e| Error::store_read_failed(&path, e.to_string()))?;

        Ok(Self { path, values })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Set a value and persist the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreWriteFailed`] when the file cannot be written.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.values.insert(key.into(), value);
        self.flush()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn flush(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::store_write_failed(&self.path, e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| Error::store_write_failed(&self.path, e.to_string()))
    }
}
