//! Resource graph builder.
//!
//! Turns a manifest into a DAG whose edges mean "must be applied
//! before". Edges come from two places: explicit `depends_on` lists and
//! `${name.attr}` references inside property values. References to
//! lookups are legal but produce no edge, since lookups resolve before
//! planning. Cycles and unknown names are fatal here, before any side
//! effect.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use stratus_spec::{Manifest, ResourceNode};

use crate::error::{CoreError, CoreResult};

/// Dependency DAG over a manifest's resources. Immutable for the run.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    /// name -> names it depends on (sorted for determinism)
    dependencies: HashMap<String, BTreeSet<String>>,
    /// Topological order over logical names, dependencies first.
    topo: Vec<String>,
}

impl ResourceGraph {
    /// Build the graph, deriving edges and rejecting cycles and
    /// references to unknown names.
    pub fn build(manifest: &Manifest) -> CoreResult<Self> {
        let mut index = HashMap::new();
        for (i, node) in manifest.resources.iter().enumerate() {
            if index.insert(node.name.clone(), i).is_some() {
                return Err(CoreError::DuplicateName(node.name.clone()));
            }
        }

        let lookup_names: HashSet<&str> =
            manifest.lookups.iter().map(|l| l.name.as_str()).collect();

        let mut dependencies: HashMap<String, BTreeSet<String>> = HashMap::new();
        for node in &manifest.resources {
            let mut deps = BTreeSet::new();
            for dep in &node.depends_on {
                if !index.contains_key(dep) {
                    return Err(CoreError::MissingReference {
                        node: node.name.clone(),
                        reference: dep.clone(),
                    });
                }
                deps.insert(dep.clone());
            }
            for reference in node.references() {
                if index.contains_key(&reference.target) {
                    deps.insert(reference.target);
                } else if !lookup_names.contains(reference.target.as_str()) {
                    return Err(CoreError::MissingReference {
                        node: node.name.clone(),
                        reference: reference.target,
                    });
                }
            }
            // A self edge can only come from depends_on/references above,
            // and both reject it via the cycle check below.
            dependencies.insert(node.name.clone(), deps);
        }

        let topo = Self::topo_sort(manifest, &dependencies)?;
        debug!(
            "Built resource graph: {} nodes, order {:?}",
            manifest.resources.len(),
            topo
        );

        Ok(Self {
            nodes: manifest.resources.clone(),
            index,
            dependencies,
            topo,
        })
    }

    /// Kahn's algorithm; leftover nodes are the cycle participants.
    fn topo_sort(
        manifest: &Manifest,
        dependencies: &HashMap<String, BTreeSet<String>>,
    ) -> CoreResult<Vec<String>> {
        let mut remaining: BTreeSet<String> = manifest
            .resources
            .iter()
            .map(|r| r.name.clone())
            .collect();
        let mut resolved: HashSet<String> = HashSet::new();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready: Vec<String> = remaining
                .iter()
                .filter(|name| {
                    dependencies
                        .get(*name)
                        .map_or(true, |deps| deps.iter().all(|d| resolved.contains(d)))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                return Err(CoreError::Cycle(remaining.into_iter().collect()));
            }

            for name in ready {
                remaining.remove(&name);
                resolved.insert(name.clone());
                order.push(name);
            }
        }

        Ok(order)
    }

    /// Declared nodes, in manifest order.
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// A node by logical name.
    pub fn node(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|i| &self.nodes[*i])
    }

    /// Names the given node depends on.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Topological order over logical names, dependencies first.
    pub fn topo_order(&self) -> &[String] {
        &self.topo
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
