//! Relation-data transport trait and implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

/// Trait for the relation-data transport.
///
/// Delivery guarantees belong to the transport, not to the core: sends are
/// fire-and-forget from the caller's perspective.
#[async_trait]
pub trait RelationBackend: Send + Sync {
    /// Versions published by the remote side of the named interface.
    ///
    /// An empty list means the far side has not listed anything yet.
    async fn remote_versions(&self, interface: &str) -> Result<Vec<String>>;

    /// Send a payload to the named interface.
    async fn send(&self, interface: &str, payload: Value) -> Result<()>;
}

/// In-memory relation backend for testing.
///
/// Remote version lists are seeded by the test; every sent payload is
/// recorded in order.
#[derive(Default)]
pub struct InMemoryRelations {
    remote: RwLock<HashMap<String, Vec<String>>>,
    sent: RwLock<Vec<(String, Value)>>,
}

impl InMemoryRelations {
    /// Create a new in-memory backend with no remote data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory backend wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed the versions the remote side lists for an interface.
    pub async fn set_remote_versions(
        &self,
        interface: impl Into<String>,
        versions: Vec<String>,
    ) {
        self.remote.write().await.insert(interface.into(), versions);
    }

    /// Snapshot of all payloads sent so far, in order.
    pub async fn sent(&self) -> Vec<(String, Value)> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl RelationBackend for InMemoryRelations {
    async fn remote_versions(&self, interface: &str) -> Result<Vec<String>> {
        Ok(self
            .remote
            .read()
            .await
            .get(interface)
            .cloned()
            .unwrap_or_default())
    }

    async fn send(&self, interface: &str, payload: Value) -> Result<()> {
        self.sent
            .write()
            .await
            .push((interface.to_string(), payload));
        Ok(())
    }
}
