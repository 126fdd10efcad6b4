//! Manifest data model.
//!
//! A manifest declares a set of resource nodes plus read-only data
//! lookups. Property values may embed `${name.attr}` placeholders that
//! reference another node's (or lookup's) output attribute; those
//! placeholders are what the graph builder turns into dependency edges.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Property map for a resource declaration.
pub type PropertyMap = serde_json::Map<String, Value>;

/// Pattern for `${name.attr}` output references inside property values.
const REFERENCE_PATTERN: &str =
    r"\$\{([A-Za-z0-9][A-Za-z0-9_-]*)\.([A-Za-z0-9_][A-Za-z0-9_.-]*)\}";

/// A reference from a property value to another node's output attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    /// Logical name of the referenced node or lookup.
    pub target: String,
    /// Output attribute on the target.
    pub attribute: String,
}

/// Lifecycle overrides for a single resource node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifecycle {
    /// Replacement ordering override. `None` falls back to the kind default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_before_destroy: Option<bool>,
}

/// A single declared resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Stable user-assigned logical name, unique within the manifest.
    pub name: String,
    /// Kind tag, e.g. `network/vpc` or `database/instance`.
    pub kind: String,
    /// Declared properties. Values may contain `${name.attr}` references.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Explicit dependencies by logical name, in addition to derived ones.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl ResourceNode {
    /// Create a node with empty properties.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            properties: PropertyMap::new(),
            depends_on: Vec::new(),
            lifecycle: Lifecycle::default(),
        }
    }

    /// Set a property value.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Add an explicit dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Override the replacement ordering for this node.
    pub fn with_create_before_destroy(mut self, enabled: bool) -> Self {
        self.lifecycle.create_before_destroy = Some(enabled);
        self
    }

    /// All `${name.attr}` references embedded in this node's properties.
    pub fn references(&self) -> Vec<PropertyRef> {
        scan_references(&self.properties)
    }

    /// Hash of the declared properties, see [`property_hash`].
    pub fn property_hash(&self) -> String {
        property_hash(&self.properties)
    }
}

/// A read-only provider query resolved before planning.
///
/// Lookups model the data the original declarations fetch up front:
/// machine images, availability zones, the caller's public address.
/// Their outputs join the reference environment under the lookup name
/// but never produce an apply-order edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLookup {
    /// Logical name, unique alongside resource names.
    pub name: String,
    /// Query kind understood by the provider, e.g. `aws/ami`.
    pub kind: String,
    /// Provider-specific query arguments.
    #[serde(default)]
    pub query: PropertyMap,
}

impl DataLookup {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            query: PropertyMap::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }
}

/// A full declaration set: the desired state for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest name, used in logs and reports.
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceNode>,
    #[serde(default)]
    pub lookups: Vec<DataLookup>,
}

impl Manifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            lookups: Vec::new(),
        }
    }

    pub fn with_resource(mut self, node: ResourceNode) -> Self {
        self.resources.push(node);
        self
    }

    pub fn with_lookup(mut self, lookup: DataLookup) -> Self {
        self.lookups.push(lookup);
        self
    }

    /// Find a resource by logical name.
    pub fn resource(&self, name: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Find a lookup by logical name.
    pub fn lookup(&self, name: &str) -> Option<&DataLookup> {
        self.lookups.iter().find(|l| l.name == name)
    }
}

/// Scan a property map for `${name.attr}` references.
pub fn scan_references(properties: &PropertyMap) -> Vec<PropertyRef> {
    let mut refs = Vec::new();
    if let Ok(re) = Regex::new(REFERENCE_PATTERN) {
        for value in properties.values() {
            scan_value(&re, value, &mut refs);
        }
    }
    refs
}

fn scan_value(re: &Regex, value: &Value, refs: &mut Vec<PropertyRef>) {
    match value {
        Value::String(s) => {
            for caps in re.captures_iter(s) {
                refs.push(PropertyRef {
                    target: caps[1].to_string(),
                    attribute: caps[2].to_string(),
                });
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_value(re, item, refs);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                scan_value(re, item, refs);
            }
        }
        _ => {}
    }
}

/// Substitute `${name.attr}` placeholders in a property map.
///
/// `resolve` returns the replacement for a reference, or `None` to leave
/// the placeholder untouched (the diff engine uses this to resolve
/// against prior outputs without failing on not-yet-created targets).
pub fn substitute_references<F>(properties: &PropertyMap, resolve: F) -> PropertyMap
where
    F: Fn(&PropertyRef) -> Option<String>,
{
    let re = match Regex::new(REFERENCE_PATTERN) {
        Ok(re) => re,
        Err(_) => return properties.clone(),
    };
    let mut out = PropertyMap::new();
    for (key, value) in properties {
        out.insert(key.clone(), substitute_value(&re, value, &resolve));
    }
    out
}

fn substitute_value<F>(re: &Regex, value: &Value, resolve: &F) -> Value
where
    F: Fn(&PropertyRef) -> Option<String>,
{
    match value {
        Value::String(s) => {
            let replaced = re.replace_all(s, |caps: &regex::Captures<'_>| {
                let reference = PropertyRef {
                    target: caps[1].to_string(),
                    attribute: caps[2].to_string(),
                };
                resolve(&reference).unwrap_or_else(|| caps[0].to_string())
            });
            Value::String(replaced.into_owned())
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute_value(re, v, resolve)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(re, v, resolve)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Sha256 hex digest of a property map in canonical form.
///
/// Maps are re-keyed in sorted order at every level so two declarations
/// that differ only in key order hash equal.
pub fn property_hash(properties: &PropertyMap) -> String {
    let canonical = canonicalize(&Value::Object(properties.clone()));
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
