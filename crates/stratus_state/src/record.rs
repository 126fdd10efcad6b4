//! State record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Last-applied snapshot of one resource.
///
/// Written only by the executor after a successful apply; read by the
/// diff engine as the baseline for the next run. Besides the property
/// hash (the cheap no-op check) the record keeps the full last-applied
/// property map, so the diff engine can tell *which* property changed,
/// and the dependency names captured at apply time, so destroys order
/// correctly even after the node left the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateRecord {
    /// Logical name the record is keyed by.
    pub name: String,
    /// Kind tag at apply time.
    pub kind: String,
    /// Provider-assigned identifier.
    pub id: String,
    /// Last-applied properties, with references resolved.
    pub properties: serde_json::Map<String, Value>,
    /// Hash of the last-applied properties.
    pub property_hash: String,
    /// Output attributes returned by the provider.
    pub outputs: serde_json::Map<String, Value>,
    /// Logical names this resource depended on at apply time.
    pub depends_on: Vec<String>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            id: id.into(),
            properties: serde_json::Map::new(),
            property_hash: String::new(),
            outputs: serde_json::Map::new(),
            depends_on: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_properties(mut self, properties: serde_json::Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property_hash(mut self, hash: impl Into<String>) -> Self {
        self.property_hash = hash.into();
        self
    }

    pub fn with_outputs(mut self, outputs: serde_json::Map<String, Value>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Fetch an output attribute as a string, if present.
    pub fn output_str(&self, attribute: &str) -> Option<String> {
        match self.outputs.get(attribute) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}
