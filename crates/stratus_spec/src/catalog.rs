//! Resource kind catalog.
//!
//! Per-kind metadata the diff engine needs: which properties cannot be
//! changed in place, and how a forced replacement should be ordered.
//! The built-in entries cover the AWS kinds the stock manifests declare;
//! unknown kinds fall back to a permissive default so new provider kinds
//! plan without a code change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::ResourceNode;

/// Ordering of the two provider calls that make up a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Destroy the old resource, then create the new one.
    DestroyBeforeCreate,
    /// Create the new resource first; destroy the old one only after
    /// the new one succeeds. Avoids downtime for swappable resources.
    CreateBeforeDestroy,
}

impl Default for ReplaceStrategy {
    fn default() -> Self {
        Self::DestroyBeforeCreate
    }
}

/// Schema entry for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct KindSchema {
    /// Property names that force a replacement when changed.
    pub immutable: Vec<String>,
    /// Default replacement ordering for this kind.
    pub replace_strategy: ReplaceStrategy,
}

impl KindSchema {
    pub fn new(immutable: &[&str], replace_strategy: ReplaceStrategy) -> Self {
        Self {
            immutable: immutable.iter().map(|s| s.to_string()).collect(),
            replace_strategy,
        }
    }

    /// Whether changing `property` requires replacing the resource.
    pub fn is_immutable(&self, property: &str) -> bool {
        self.immutable.iter().any(|p| p == property)
    }
}

/// Catalog mapping kind tags to their schemas.
#[derive(Debug, Clone, Default)]
pub struct KindCatalog {
    kinds: HashMap<String, KindSchema>,
}

impl KindCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Catalog pre-populated with the built-in AWS kinds.
    pub fn builtin() -> Self {
        use ReplaceStrategy::{CreateBeforeDestroy, DestroyBeforeCreate};

        let entries: &[(&str, &[&str], ReplaceStrategy)] = &[
            ("network/vpc", &["cidr_block", "instance_tenancy"], DestroyBeforeCreate),
            ("network/subnet", &["vpc_id", "cidr_block", "availability_zone"], DestroyBeforeCreate),
            ("network/internet-gateway", &[], DestroyBeforeCreate),
            ("network/route-table", &["vpc_id"], DestroyBeforeCreate),
            ("network/route", &["route_table_id", "destination_cidr_block"], DestroyBeforeCreate),
            ("network/security-group", &["name", "vpc_id"], DestroyBeforeCreate),
            ("compute/key-pair", &["key_name", "public_key"], DestroyBeforeCreate),
            ("compute/instance", &["ami_id", "subnet_id", "key_name"], DestroyBeforeCreate),
            ("compute/launch-template", &["name"], CreateBeforeDestroy),
            ("compute/autoscaling-group", &["name"], DestroyBeforeCreate),
            ("compute/autoscaling-policy", &["name", "autoscaling_group"], DestroyBeforeCreate),
            ("database/subnet-group", &["name"], DestroyBeforeCreate),
            ("database/parameter-group", &["name", "family"], DestroyBeforeCreate),
            ("database/instance", &["engine", "username", "storage_encrypted"], DestroyBeforeCreate),
            ("lb/load-balancer", &["name", "load_balancer_type", "internal"], CreateBeforeDestroy),
            ("lb/target-group", &["name", "port", "protocol", "vpc_id"], CreateBeforeDestroy),
            ("lb/listener", &["load_balancer_arn"], DestroyBeforeCreate),
            ("dns/record", &["name", "type"], DestroyBeforeCreate),
            ("iam/role", &["name"], DestroyBeforeCreate),
            ("iam/policy", &["name"], DestroyBeforeCreate),
            ("iam/instance-profile", &["name"], DestroyBeforeCreate),
            ("monitoring/alarm", &["name"], DestroyBeforeCreate),
            ("messaging/topic", &["name", "fifo_topic"], DestroyBeforeCreate),
        ];

        let mut catalog = Self::new();
        for (kind, immutable, strategy) in entries {
            catalog.register(*kind, KindSchema::new(immutable, *strategy));
        }
        catalog
    }

    /// Register or replace a kind schema.
    pub fn register(&mut self, kind: impl Into<String>, schema: KindSchema) {
        self.kinds.insert(kind.into(), schema);
    }

    /// Whether the kind has a registered schema.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Schema for a kind. Unknown kinds get the permissive default.
    pub fn schema(&self, kind: &str) -> KindSchema {
        self.kinds.get(kind).cloned().unwrap_or_default()
    }

    /// Effective replacement ordering for a node: the node's lifecycle
    /// override wins over the kind default.
    pub fn replace_strategy(&self, node: &ResourceNode) -> ReplaceStrategy {
        match node.lifecycle.create_before_destroy {
            Some(true) => ReplaceStrategy::CreateBeforeDestroy,
            Some(false) => ReplaceStrategy::DestroyBeforeCreate,
            None => self.schema(&node.kind).replace_strategy,
        }
    }
}
