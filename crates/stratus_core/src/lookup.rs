//! Data lookup resolution.
//!
//! Lookups are read-only provider queries (machine images, availability
//! zones, the caller's address) resolved eagerly before diffing, so
//! their outputs are plain values by the time planning starts. Results
//! are cached per run keyed by kind + canonical query: declaring the
//! same query twice costs one provider call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use stratus_provider::{AttributeMap, Provider};
use stratus_spec::Manifest;

use crate::error::{CoreError, CoreResult};

/// Resolves a manifest's lookups with a per-run cache.
pub struct LookupResolver {
    provider: Arc<dyn Provider>,
    cache: Mutex<HashMap<String, AttributeMap>>,
}

impl LookupResolver {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve every lookup in the manifest. Outputs are keyed by the
    /// lookup's logical name. Any failure aborts the run before any
    /// change is applied.
    pub async fn resolve_all(
        &self,
        manifest: &Manifest,
    ) -> CoreResult<HashMap<String, AttributeMap>> {
        let mut resolved = HashMap::new();
        for lookup in &manifest.lookups {
            let key = cache_key(&lookup.kind, &lookup.query);

            let mut cache = self.cache.lock().await;
            if let Some(outputs) = cache.get(&key) {
                debug!("Lookup '{}' served from cache", lookup.name);
                resolved.insert(lookup.name.clone(), outputs.clone());
                continue;
            }
            drop(cache);

            let outputs = self
                .provider
                .lookup(&lookup.kind, &lookup.query)
                .await
                .map_err(|e| CoreError::LookupFailed {
                    name: lookup.name.clone(),
                    source: e,
                })?;

            debug!("Resolved lookup '{}' ({})", lookup.name, lookup.kind);
            self.cache.lock().await.insert(key, outputs.clone());
            resolved.insert(lookup.name.clone(), outputs);
        }
        Ok(resolved)
    }
}

/// Cache key: kind plus the query in canonical (sorted-key) form.
fn cache_key(kind: &str, query: &AttributeMap) -> String {
    let canonical = stratus_spec::property_hash(query);
    format!("{}:{}", kind, canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratus_provider::SimProvider;
    use stratus_spec::DataLookup;

    fn ami_outputs() -> AttributeMap {
        let mut outputs = AttributeMap::new();
        outputs.insert("id".to_string(), json!("ami-42"));
        outputs
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let provider = SimProvider::new().with_lookup("aws/ami", ami_outputs());
        let resolver = LookupResolver::new(Arc::new(provider));

        let manifest = Manifest::new("m").with_lookup(
            DataLookup::new("base-ami", "aws/ami").with_query("owner", json!("self")),
        );

        let resolved = resolver.resolve_all(&manifest).await.unwrap();
        assert_eq!(resolved["base-ami"]["id"], json!("ami-42"));
    }

    #[tokio::test]
    async fn test_duplicate_queries_hit_provider_once() {
        let provider = SimProvider::new().with_lookup("aws/ami", ami_outputs());
        let resolver = LookupResolver::new(Arc::new(provider.clone()));

        // The original declarations issue the same image query twice;
        // the cache collapses them into one provider call.
        let manifest = Manifest::new("m")
            .with_lookup(DataLookup::new("ami-for-web", "aws/ami").with_query("owner", json!("self")))
            .with_lookup(DataLookup::new("ami-for-asg", "aws/ami").with_query("owner", json!("self")));

        let resolved = resolver.resolve_all(&manifest).await.unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(provider.lookup_count("aws/ami"), 1);
    }

    #[tokio::test]
    async fn test_distinct_queries_are_not_shared() {
        let provider = SimProvider::new().with_lookup("aws/ami", ami_outputs());
        let resolver = LookupResolver::new(Arc::new(provider.clone()));

        let manifest = Manifest::new("m")
            .with_lookup(DataLookup::new("a", "aws/ami").with_query("owner", json!("self")))
            .with_lookup(DataLookup::new("b", "aws/ami").with_query("owner", json!("amazon")));

        resolver.resolve_all(&manifest).await.unwrap();
        assert_eq!(provider.lookup_count("aws/ami"), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_fatal() {
        let provider = SimProvider::new();
        let resolver = LookupResolver::new(Arc::new(provider));

        let manifest = Manifest::new("m").with_lookup(DataLookup::new("zones", "aws/zones"));
        let err = resolver.resolve_all(&manifest).await.unwrap_err();
        assert!(matches!(err, CoreError::LookupFailed { .. }));
    }
}
