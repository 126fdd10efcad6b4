//! Diff engine.
//!
//! Compares the desired graph against the last-known state and emits a
//! changeset. Ordering is the planner's job; entries here are
//! deliberately unordered. Reference placeholders are resolved against
//! prior outputs before hashing, so a declaration that did not change
//! hashes equal to what was last applied.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use stratus_provider::AttributeMap;
use stratus_spec::{
    property_hash, substitute_references, KindCatalog, PropertyMap, ReplaceStrategy, ResourceNode,
};
use stratus_state::StateRecord;

use crate::graph::ResourceGraph;

/// The operation a change entry performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Create,
    Update,
    Replace { strategy: ReplaceStrategy },
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Create => "create",
            ChangeOp::Update => "update",
            ChangeOp::Replace { .. } => "replace",
            ChangeOp::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pending change for a logical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub name: String,
    pub kind: String,
    pub op: ChangeOp,
    /// Desired properties, still carrying `${..}` placeholders; the
    /// executor resolves them against fresh outputs. `None` for Delete.
    pub properties: Option<PropertyMap>,
    /// Provider identifier from prior state (Update/Replace/Delete).
    pub prior_id: Option<String>,
    /// Desired-graph dependencies of this node (empty for Delete).
    pub depends_on: Vec<String>,
}

/// Unordered set of pending changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Changeset {
    pub entries: Vec<ChangeEntry>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, name: &str) -> Option<&ChangeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Computes a changeset from desired graph and prior state.
pub struct DiffEngine<'a> {
    catalog: &'a KindCatalog,
}

impl<'a> DiffEngine<'a> {
    pub fn new(catalog: &'a KindCatalog) -> Self {
        Self { catalog }
    }

    /// Diff the desired graph against prior state. `env` carries output
    /// attributes by name (resolved lookups plus prior outputs) and is
    /// used only for change detection; entries keep raw properties.
    pub fn diff(
        &self,
        graph: &ResourceGraph,
        prior: &HashMap<String, StateRecord>,
        env: &HashMap<String, AttributeMap>,
    ) -> Changeset {
        let mut entries = Vec::new();

        for node in graph.nodes() {
            match prior.get(&node.name) {
                None => {
                    entries.push(ChangeEntry {
                        name: node.name.clone(),
                        kind: node.kind.clone(),
                        op: ChangeOp::Create,
                        properties: Some(node.properties.clone()),
                        prior_id: None,
                        depends_on: graph.dependencies_of(&node.name),
                    });
                }
                Some(record) => {
                    if let Some(op) = self.diff_existing(node, record, env) {
                        entries.push(ChangeEntry {
                            name: node.name.clone(),
                            kind: node.kind.clone(),
                            op,
                            properties: Some(node.properties.clone()),
                            prior_id: Some(record.id.clone()),
                            depends_on: graph.dependencies_of(&node.name),
                        });
                    }
                }
            }
        }

        // Anything in prior state but absent from the desired graph is
        // destroyed.
        for (name, record) in prior {
            if graph.node(name).is_none() {
                entries.push(ChangeEntry {
                    name: name.clone(),
                    kind: record.kind.clone(),
                    op: ChangeOp::Delete,
                    properties: None,
                    prior_id: Some(record.id.clone()),
                    depends_on: Vec::new(),
                });
            }
        }

        debug!("Diff produced {} change entries", entries.len());
        Changeset { entries }
    }

    /// `None` means no-op; otherwise Update or Replace.
    fn diff_existing(
        &self,
        node: &ResourceNode,
        record: &StateRecord,
        env: &HashMap<String, AttributeMap>,
    ) -> Option<ChangeOp> {
        // A kind change can never be an in-place update.
        if node.kind != record.kind {
            return Some(ChangeOp::Replace {
                strategy: self.catalog.replace_strategy(node),
            });
        }

        let resolved = resolve_properties(&node.properties, env);
        if property_hash(&resolved) == record.property_hash {
            return None;
        }

        let schema = self.catalog.schema(&node.kind);
        let changed = changed_properties(&resolved, &record.properties);
        if changed.iter().any(|p| schema.is_immutable(p)) {
            Some(ChangeOp::Replace {
                strategy: self.catalog.replace_strategy(node),
            })
        } else {
            Some(ChangeOp::Update)
        }
    }
}

/// Property names whose values differ between two maps, including
/// added and removed keys.
fn changed_properties(desired: &PropertyMap, applied: &PropertyMap) -> Vec<String> {
    let keys: HashSet<&String> = desired.keys().chain(applied.keys()).collect();
    keys.into_iter()
        .filter(|k| desired.get(*k) != applied.get(*k))
        .cloned()
        .collect()
}

/// Substitute `${name.attr}` placeholders against an output environment.
/// Unresolvable references stay in place.
pub(crate) fn resolve_properties(
    properties: &PropertyMap,
    env: &HashMap<String, AttributeMap>,
) -> PropertyMap {
    substitute_references(properties, |r| {
        env.get(&r.target)
            .and_then(|attrs| attrs.get(&r.attribute))
            .map(attribute_to_string)
    })
}

fn attribute_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratus_spec::Manifest;

    fn catalog() -> KindCatalog {
        KindCatalog::builtin()
    }

    fn graph(manifest: &Manifest) -> ResourceGraph {
        ResourceGraph::build(manifest).unwrap()
    }

    fn record_for(node: &ResourceNode, id: &str, env: &HashMap<String, AttributeMap>) -> StateRecord {
        let resolved = resolve_properties(&node.properties, env);
        let hash = property_hash(&resolved);
        StateRecord::new(&node.name, &node.kind, id)
            .with_properties(resolved)
            .with_property_hash(hash)
    }

    #[test]
    fn test_empty_state_creates_everything() {
        let manifest = Manifest::new("m")
            .with_resource(ResourceNode::new("network", "network/vpc"))
            .with_resource(
                ResourceNode::new("database", "database/instance")
                    .with_property("vpc_id", json!("${network.id}")),
            );
        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);

        let changeset = engine.diff(&graph(&manifest), &HashMap::new(), &HashMap::new());
        assert_eq!(changeset.len(), 2);
        assert!(changeset
            .entries
            .iter()
            .all(|e| matches!(e.op, ChangeOp::Create)));
    }

    #[test]
    fn test_unchanged_is_noop() {
        let node = ResourceNode::new("network", "network/vpc")
            .with_property("cidr_block", json!("10.0.0.0/16"));
        let manifest = Manifest::new("m").with_resource(node.clone());
        let env = HashMap::new();

        let mut prior = HashMap::new();
        prior.insert("network".to_string(), record_for(&node, "vpc-1", &env));

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &env);
        assert!(changeset.is_empty());
    }

    #[test]
    fn test_mutable_change_is_update() {
        let applied = ResourceNode::new("web", "compute/instance")
            .with_property("instance_type", json!("t2.micro"));
        let desired = ResourceNode::new("web", "compute/instance")
            .with_property("instance_type", json!("t2.small"));
        let manifest = Manifest::new("m").with_resource(desired);
        let env = HashMap::new();

        let mut prior = HashMap::new();
        prior.insert("web".to_string(), record_for(&applied, "i-1", &env));

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &env);
        assert_eq!(changeset.len(), 1);
        assert_eq!(changeset.entries[0].op, ChangeOp::Update);
        assert_eq!(changeset.entries[0].prior_id.as_deref(), Some("i-1"));
    }

    #[test]
    fn test_immutable_change_is_replace() {
        let applied = ResourceNode::new("db", "database/instance")
            .with_property("engine", json!("postgres"));
        let desired = ResourceNode::new("db", "database/instance")
            .with_property("engine", json!("mysql"));
        let manifest = Manifest::new("m").with_resource(desired);
        let env = HashMap::new();

        let mut prior = HashMap::new();
        prior.insert("db".to_string(), record_for(&applied, "rds-1", &env));

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &env);
        assert_eq!(
            changeset.entries[0].op,
            ChangeOp::Replace {
                strategy: ReplaceStrategy::DestroyBeforeCreate
            }
        );
    }

    #[test]
    fn test_replace_honors_lifecycle_override() {
        let applied = ResourceNode::new("db", "database/instance")
            .with_property("engine", json!("postgres"));
        let desired = ResourceNode::new("db", "database/instance")
            .with_property("engine", json!("mysql"))
            .with_create_before_destroy(true);
        let manifest = Manifest::new("m").with_resource(desired);
        let env = HashMap::new();

        let mut prior = HashMap::new();
        prior.insert("db".to_string(), record_for(&applied, "rds-1", &env));

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &env);
        assert_eq!(
            changeset.entries[0].op,
            ChangeOp::Replace {
                strategy: ReplaceStrategy::CreateBeforeDestroy
            }
        );
    }

    #[test]
    fn test_removed_resource_is_delete() {
        let manifest = Manifest::new("m");
        let mut prior = HashMap::new();
        prior.insert(
            "old-topic".to_string(),
            StateRecord::new("old-topic", "messaging/topic", "arn-1"),
        );

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &HashMap::new());
        assert_eq!(changeset.len(), 1);
        assert_eq!(changeset.entries[0].op, ChangeOp::Delete);
        assert_eq!(changeset.entries[0].prior_id.as_deref(), Some("arn-1"));
    }

    #[test]
    fn test_kind_change_is_replace() {
        let desired = ResourceNode::new("thing", "network/subnet");
        let manifest = Manifest::new("m").with_resource(desired);

        let mut prior = HashMap::new();
        prior.insert(
            "thing".to_string(),
            StateRecord::new("thing", "network/vpc", "vpc-1"),
        );

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &HashMap::new());
        assert!(matches!(changeset.entries[0].op, ChangeOp::Replace { .. }));
    }

    #[test]
    fn test_reference_resolved_before_hashing() {
        // Declaration still says ${network.id}; the record holds the
        // resolved value. With the output in the env, nothing changed.
        let node = ResourceNode::new("db", "database/instance")
            .with_property("vpc_id", json!("${network.id}"));
        let manifest = Manifest::new("m")
            .with_resource(ResourceNode::new("network", "network/vpc"))
            .with_resource(node.clone());

        let mut network_outputs = AttributeMap::new();
        network_outputs.insert("id".to_string(), json!("vpc-1"));
        let mut env = HashMap::new();
        env.insert("network".to_string(), network_outputs);

        let mut prior = HashMap::new();
        let network = ResourceNode::new("network", "network/vpc");
        prior.insert("network".to_string(), record_for(&network, "vpc-1", &env));
        prior.insert("db".to_string(), record_for(&node, "rds-1", &env));

        let catalog = catalog();
        let engine = DiffEngine::new(&catalog);
        let changeset = engine.diff(&graph(&manifest), &prior, &env);
        assert!(changeset.is_empty(), "entries: {:?}", changeset.entries);
    }
}
