//! In-memory state store for tests and plan-only runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StateResult;
use crate::record::StateRecord;
use crate::store::StateStore;

/// State store backed by a shared map. Nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store with records.
    pub async fn seed(&self, records: impl IntoIterator<Item = StateRecord>) {
        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.name.clone(), record);
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read_all(&self) -> StateResult<HashMap<String, StateRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, name: &str) -> StateResult<Option<StateRecord>> {
        Ok(self.records.read().await.get(name).cloned())
    }

    async fn upsert(&self, record: StateRecord) -> StateResult<()> {
        self.records
            .write()
            .await
            .insert(record.name.clone(), record);
        Ok(())
    }

    async fn remove(&self, name: &str) -> StateResult<()> {
        self.records.write().await.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basics() {
        let store = MemoryStateStore::new();
        store
            .upsert(StateRecord::new("vpc", "network/vpc", "vpc-1"))
            .await
            .unwrap();

        assert!(store.get("vpc").await.unwrap().is_some());
        assert_eq!(store.read_all().await.unwrap().len(), 1);

        store.remove("vpc").await.unwrap();
        assert!(store.get("vpc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed() {
        let store = MemoryStateStore::new();
        store
            .seed(vec![
                StateRecord::new("vpc", "network/vpc", "vpc-1"),
                StateRecord::new("db", "database/instance", "rds-1"),
            ])
            .await;
        assert_eq!(store.read_all().await.unwrap().len(), 2);
    }
}
