//! In-memory simulation provider.
//!
//! Keeps a live resource table, captures every call for verification,
//! and can be scripted to fail per logical name (permanently, or
//! transiently for a bounded number of attempts). Used by the test
//! suites and bound by the CLI, since real cloud APIs live outside
//! this workspace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ApplyOp, ApplyRequest, AttributeMap, Provider, ResourceOutputs};

/// A captured provider call, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    Apply { name: String, op: &'static str },
    Destroy { kind: String, id: String },
    Lookup { kind: String },
}

/// Scripted failure for one logical name.
#[derive(Debug, Clone)]
enum FailureScript {
    Permanent(String),
    /// Fail transiently `remaining` more times, then succeed.
    Transient { remaining: usize, message: String },
}

/// A resource held by the simulation.
#[derive(Debug, Clone)]
pub struct SimResource {
    pub kind: String,
    pub name: String,
    pub properties: AttributeMap,
}

/// Simulation provider with captured calls and failure injection.
#[derive(Clone, Default)]
pub struct SimProvider {
    resources: Arc<RwLock<HashMap<String, SimResource>>>,
    calls: Arc<RwLock<Vec<SimCall>>>,
    failures: Arc<RwLock<HashMap<String, FailureScript>>>,
    /// Extra output attributes to return per logical name.
    outputs: Arc<RwLock<HashMap<String, AttributeMap>>>,
    /// Seeded lookup results keyed by lookup kind.
    lookups: Arc<RwLock<HashMap<String, AttributeMap>>>,
}

impl SimProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a permanent failure for a logical name.
    pub fn fail_permanent(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures
            .write()
            .insert(name.into(), FailureScript::Permanent(message.into()));
        self
    }

    /// Script `times` transient failures for a logical name; later
    /// attempts succeed.
    pub fn fail_transient(
        self,
        name: impl Into<String>,
        times: usize,
        message: impl Into<String>,
    ) -> Self {
        self.failures.write().insert(
            name.into(),
            FailureScript::Transient {
                remaining: times,
                message: message.into(),
            },
        );
        self
    }

    /// Add extra output attributes for a logical name's applies.
    pub fn with_outputs(self, name: impl Into<String>, outputs: AttributeMap) -> Self {
        self.outputs.write().insert(name.into(), outputs);
        self
    }

    /// Seed a lookup result for a lookup kind.
    pub fn with_lookup(self, kind: impl Into<String>, outputs: AttributeMap) -> Self {
        self.lookups.write().insert(kind.into(), outputs);
        self
    }

    /// All captured calls in arrival order.
    pub fn calls(&self) -> Vec<SimCall> {
        self.calls.read().clone()
    }

    /// Logical names of successful applies, in completion order.
    pub fn applied_names(&self) -> Vec<String> {
        self.calls
            .read()
            .iter()
            .filter_map(|c| match c {
                SimCall::Apply { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of lookup calls for a kind.
    pub fn lookup_count(&self, kind: &str) -> usize {
        self.calls
            .read()
            .iter()
            .filter(|c| matches!(c, SimCall::Lookup { kind: k } if k == kind))
            .count()
    }

    /// The live resource table, keyed by provider identifier.
    pub fn resources(&self) -> HashMap<String, SimResource> {
        self.resources.read().clone()
    }

    fn check_failure(&self, name: &str) -> ProviderResult<()> {
        let mut failures = self.failures.write();
        match failures.get_mut(name) {
            Some(FailureScript::Permanent(message)) => {
                Err(ProviderError::Permanent(message.clone()))
            }
            Some(FailureScript::Transient { remaining, message }) => {
                if *remaining == 0 {
                    Ok(())
                } else {
                    *remaining -= 1;
                    Err(ProviderError::Transient(message.clone()))
                }
            }
            None => Ok(()),
        }
    }

    fn record(&self, call: SimCall) {
        self.calls.write().push(call);
    }
}

#[async_trait]
impl Provider for SimProvider {
    async fn apply(&self, request: ApplyRequest) -> ProviderResult<ResourceOutputs> {
        let op = match &request.op {
            ApplyOp::Create => "create",
            ApplyOp::Update { .. } => "update",
        };
        self.check_failure(&request.name)?;

        let id = match &request.op {
            ApplyOp::Create => format!("sim-{}", Uuid::new_v4()),
            // An unknown identifier is adopted rather than rejected:
            // state files outlive this process-local table.
            ApplyOp::Update { id } => id.clone(),
        };

        self.resources.write().insert(
            id.clone(),
            SimResource {
                kind: request.kind.clone(),
                name: request.name.clone(),
                properties: request.properties.clone(),
            },
        );
        self.record(SimCall::Apply {
            name: request.name.clone(),
            op,
        });

        let mut outputs = ResourceOutputs::new(id);
        if let Some(extra) = self.outputs.read().get(&request.name) {
            for (k, v) in extra {
                outputs.attributes.insert(k.clone(), v.clone());
            }
        }
        Ok(outputs)
    }

    async fn destroy(&self, kind: &str, id: &str) -> ProviderResult<()> {
        self.record(SimCall::Destroy {
            kind: kind.to_string(),
            id: id.to_string(),
        });
        if self.resources.write().remove(id).is_none() {
            return Err(ProviderError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn lookup(&self, kind: &str, query: &AttributeMap) -> ProviderResult<AttributeMap> {
        self.record(SimCall::Lookup {
            kind: kind.to_string(),
        });
        if let Some(outputs) = self.lookups.read().get(kind) {
            return Ok(outputs.clone());
        }
        if kind == "net/subnets" {
            return subnets_lookup(query);
        }
        Err(ProviderError::UnsupportedLookup(kind.to_string()))
    }
}

/// Built-in `net/subnets` lookup: split a parent block into consecutive
/// subnets, exposed as `subnet_0..subnet_{count-1}`.
fn subnets_lookup(query: &AttributeMap) -> ProviderResult<AttributeMap> {
    let cidr = query
        .get("cidr_block")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Permanent("net/subnets requires 'cidr_block'".to_string()))?;
    let count = query
        .get("count")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ProviderError::Permanent("net/subnets requires 'count'".to_string()))?;
    let new_bits = query
        .get("new_bits")
        .and_then(|v| v.as_u64())
        .filter(|b| *b <= 32)
        .ok_or_else(|| ProviderError::Permanent("net/subnets requires 'new_bits' (0-32)".to_string()))?;

    let blocks = crate::cidr::subdivide(cidr, count as usize, new_bits as u8)?;
    let mut outputs = AttributeMap::new();
    for (i, block) in blocks.iter().enumerate() {
        outputs.insert(format!("subnet_{}", i), Value::String(block.clone()));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let provider = SimProvider::new();
        let outputs = provider
            .apply(ApplyRequest::create(
                "network/vpc",
                "vpc",
                props(&[("cidr_block", json!("10.0.0.0/16"))]),
            ))
            .await
            .unwrap();

        assert!(outputs.id.starts_with("sim-"));
        assert_eq!(outputs.attributes["id"], json!(outputs.id));
        assert_eq!(provider.resources().len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_identifier() {
        let provider = SimProvider::new();
        let created = provider
            .apply(ApplyRequest::create("network/vpc", "vpc", AttributeMap::new()))
            .await
            .unwrap();

        let updated = provider
            .apply(ApplyRequest::update(
                "network/vpc",
                "vpc",
                &created.id,
                props(&[("cidr_block", json!("10.1.0.0/16"))]),
            ))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(provider.resources().len(), 1);
    }

    #[tokio::test]
    async fn test_update_adopts_unknown_identifier() {
        // State files outlive the in-memory table; an update against a
        // fresh process keeps working.
        let provider = SimProvider::new();
        let outputs = provider
            .apply(ApplyRequest::update(
                "network/vpc",
                "vpc",
                "sim-recorded-earlier",
                AttributeMap::new(),
            ))
            .await
            .unwrap();
        assert_eq!(outputs.id, "sim-recorded-earlier");
    }

    #[tokio::test]
    async fn test_destroy_removes() {
        let provider = SimProvider::new();
        let outputs = provider
            .apply(ApplyRequest::create("network/vpc", "vpc", AttributeMap::new()))
            .await
            .unwrap();

        provider.destroy("network/vpc", &outputs.id).await.unwrap();
        assert!(provider.resources().is_empty());

        let again = provider.destroy("network/vpc", &outputs.id).await;
        assert!(matches!(again, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_transient_failure_script() {
        let provider = SimProvider::new().fail_transient("vpc", 2, "throttled");

        for _ in 0..2 {
            let err = provider
                .apply(ApplyRequest::create("network/vpc", "vpc", AttributeMap::new()))
                .await
                .unwrap_err();
            assert!(err.is_transient());
        }

        // Third attempt succeeds
        provider
            .apply(ApplyRequest::create("network/vpc", "vpc", AttributeMap::new()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_permanent_failure_script() {
        let provider = SimProvider::new().fail_permanent("db", "invalid property");
        let err = provider
            .apply(ApplyRequest::create("database/instance", "db", AttributeMap::new()))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_scripted_outputs() {
        let provider = SimProvider::new()
            .with_outputs("db", props(&[("endpoint", json!("db.internal:5432"))]));

        let outputs = provider
            .apply(ApplyRequest::create("database/instance", "db", AttributeMap::new()))
            .await
            .unwrap();
        assert_eq!(outputs.attributes["endpoint"], json!("db.internal:5432"));
    }

    #[tokio::test]
    async fn test_lookup_seeded_and_counted() {
        let provider = SimProvider::new().with_lookup("aws/ami", props(&[("id", json!("ami-42"))]));

        let result = provider.lookup("aws/ami", &AttributeMap::new()).await.unwrap();
        assert_eq!(result["id"], json!("ami-42"));
        assert_eq!(provider.lookup_count("aws/ami"), 1);

        let missing = provider.lookup("aws/zones", &AttributeMap::new()).await;
        assert!(matches!(missing, Err(ProviderError::UnsupportedLookup(_))));
    }

    #[tokio::test]
    async fn test_builtin_subnet_lookup() {
        let provider = SimProvider::new();
        let query = props(&[
            ("cidr_block", json!("10.0.0.0/16")),
            ("count", json!(2)),
            ("new_bits", json!(24)),
        ]);

        let outputs = provider.lookup("net/subnets", &query).await.unwrap();
        assert_eq!(outputs["subnet_0"], json!("10.0.0.0/24"));
        assert_eq!(outputs["subnet_1"], json!("10.0.1.0/24"));
    }

    #[tokio::test]
    async fn test_call_order_captured() {
        let provider = SimProvider::new();
        let outputs = provider
            .apply(ApplyRequest::create("network/vpc", "vpc", AttributeMap::new()))
            .await
            .unwrap();
        provider.destroy("network/vpc", &outputs.id).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], SimCall::Apply { .. }));
        assert!(matches!(calls[1], SimCall::Destroy { .. }));
    }
}
