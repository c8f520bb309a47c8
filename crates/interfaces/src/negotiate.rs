//! Version negotiation for declared relation interfaces.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::relation::RelationBackend;

/// A locally declared interface and the versions this unit supports,
/// in preference order.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    /// Interface name.
    pub name: String,
    /// Supported versions, most preferred first.
    pub supported: Vec<String>,
}

impl InterfaceDecl {
    /// Declare an interface with its supported versions.
    pub fn new(name: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            name: name.into(),
            supported,
        }
    }
}

/// A successfully negotiated interface handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedInterface {
    /// Interface name.
    pub name: String,
    /// The version both sides agreed on.
    pub version: String,
}

/// The set of negotiated interfaces, populated once at startup and
/// consulted (never mutated) afterwards.
#[derive(Debug, Clone, Default)]
pub struct InterfaceSet {
    handles: HashMap<String, NegotiatedInterface>,
}

impl InterfaceSet {
    /// Create an empty interface set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a negotiated interface by name.
    pub fn get(&self, name: &str) -> Option<&NegotiatedInterface> {
        self.handles.get(name)
    }

    /// Whether the named interface was negotiated.
    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Whether no interface was negotiated.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of negotiated interfaces.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    fn insert(&mut self, handle: NegotiatedInterface) {
        self.handles.insert(handle.name.clone(), handle);
    }
}

/// Negotiates version compatibility for all declared interfaces.
pub struct Negotiator {
    backend: Arc<dyn RelationBackend>,
    declared: Vec<InterfaceDecl>,
}

impl Negotiator {
    /// Create a negotiator over the given transport.
    pub fn new(backend: Arc<dyn RelationBackend>) -> Self {
        Self {
            backend,
            declared: Vec::new(),
        }
    }

    /// Declare an interface to negotiate.
    pub fn declare(mut self, name: impl Into<String>, supported: Vec<String>) -> Self {
        self.declared.push(InterfaceDecl::new(name, supported));
        self
    }

    /// Negotiate every declared interface.
    ///
    /// Fails on the first interface whose far side lists no versions yet
    /// ([`Error::NoVersionsListed`], retryable) or lists only versions we
    /// do not support ([`Error::Incompatible`], durable).
    ///
    /// # Errors
    ///
    /// Returns the tagged negotiation error for the caller to map onto a
    /// unit status; no partial set is returned.
    pub async fn negotiate(&self) -> Result<InterfaceSet> {
        let mut set = InterfaceSet::empty();

        for decl in &self.declared {
            let remote = self.backend.remote_versions(&decl.name).await?;
            debug!(interface = %decl.name, remote = ?remote, "remote versions");

            if remote.is_empty() {
                return Err(Error::no_versions_listed(&decl.name));
            }

            let version = decl
                .supported
                .iter()
                .find(|v| remote.contains(v))
                .cloned()
                .ok_or_else(|| {
                    Error::incompatible(&decl.name, remote.clone(), decl.supported.clone())
                })?;

            info!(interface = %decl.name, version = %version, "interface negotiated");
            set.insert(NegotiatedInterface {
                name: decl.name.clone(),
                version,
            });
        }

        Ok(set)
    }
}
