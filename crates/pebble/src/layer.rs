//! Declarative layer descriptors.
//!
//! A layer is a named, declarative service definition applied to the
//! supervisor. Layers are pure values: rebuilt fresh on every
//! reconciliation pass and reapplied wholesale, never mutated in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a service definition interacts with an earlier definition under the
/// same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    /// Fully replace the prior service definition.
    Replace,
}

/// Startup policy for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    /// Start the service automatically.
    Enabled,
}

/// Declarative description of one supervised service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Merge behavior against a prior definition under the same name.
    #[serde(rename = "override")]
    pub override_: Override,
    /// One-line summary of the service.
    pub summary: String,
    /// Command line, including any configuration flags.
    pub command: String,
    /// Startup policy.
    pub startup: Startup,
    /// Environment passed to the process.
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl ServiceSpec {
    /// Create a service spec with replace semantics and enabled startup.
    pub fn new(summary: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            override_: Override::Replace,
            summary: summary.into(),
            command: command.into(),
            startup: Startup::Enabled,
            environment: HashMap::new(),
        }
    }

    /// Set the environment mapping.
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }
}

/// A named layer: a set of service definitions applied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// One-line summary of the layer.
    pub summary: String,
    /// Longer description of the layer.
    pub description: String,
    /// Service definitions keyed by service name.
    pub services: HashMap<String, ServiceSpec>,
}

impl Layer {
    /// Create an empty layer.
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            services: HashMap::new(),
        }
    }

    /// Add a service definition to the layer.
    pub fn with_service(mut self, name: impl Into<String>, spec: ServiceSpec) -> Self {
        self.services.insert(name.into(), spec);
        self
    }

    /// Look up a service definition by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }
}
