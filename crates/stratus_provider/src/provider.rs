//! Provider capability trait.
//!
//! The provider is the seam between the orchestration core and the
//! real world. The core hands it fully-resolved property maps; the
//! provider performs the cloud call and hands back the assigned
//! identifier and output attributes. Real cloud bindings attach here;
//! this workspace ships only the in-memory simulation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderResult;

/// Attribute map produced by providers (outputs, lookup results).
pub type AttributeMap = serde_json::Map<String, Value>;

/// Which mutation an apply request performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOp {
    /// Provision a new resource.
    Create,
    /// Mutate an existing resource in place.
    Update {
        /// Provider-assigned identifier of the resource to update.
        id: String,
    },
}

/// One mutation against the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Kind tag, e.g. `network/vpc`.
    pub kind: String,
    /// Logical name, for provider-side tagging and logs.
    pub name: String,
    pub op: ApplyOp,
    /// Fully-resolved properties (no `${..}` placeholders remain).
    pub properties: AttributeMap,
}

impl ApplyRequest {
    pub fn create(kind: impl Into<String>, name: impl Into<String>, properties: AttributeMap) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            op: ApplyOp::Create,
            properties,
        }
    }

    pub fn update(
        kind: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
        properties: AttributeMap,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            op: ApplyOp::Update { id: id.into() },
            properties,
        }
    }
}

/// Result of a successful apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutputs {
    /// Provider-assigned identifier.
    pub id: String,
    /// Output attributes other resources may reference.
    pub attributes: AttributeMap,
}

impl ResourceOutputs {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut attributes = AttributeMap::new();
        attributes.insert("id".to_string(), Value::String(id.clone()));
        Self { id, attributes }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Capability trait the executor dispatches against.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create or update a resource, returning its outputs.
    async fn apply(&self, request: ApplyRequest) -> ProviderResult<ResourceOutputs>;

    /// Destroy a resource by provider identifier.
    async fn destroy(&self, kind: &str, id: &str) -> ProviderResult<()>;

    /// Run a read-only query (machine images, zones, addresses).
    /// Must be side-effect free; the core caches results per run.
    async fn lookup(&self, kind: &str, query: &AttributeMap) -> ProviderResult<AttributeMap>;
}
