//! State store capability trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StateResult;
use crate::record::StateRecord;

/// Persistence for last-known resource state, keyed by logical name.
///
/// Only the executor writes, one write per logical name per run, after
/// the corresponding provider call succeeds. `upsert` must be atomic per
/// entry so a crash mid-run leaves previously-completed entries durable.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// All records, keyed by logical name. The diff baseline.
    async fn read_all(&self) -> StateResult<HashMap<String, StateRecord>>;

    /// A single record, or `None` if the name has never been applied.
    async fn get(&self, name: &str) -> StateResult<Option<StateRecord>>;

    /// Insert or replace the record for its logical name.
    async fn upsert(&self, record: StateRecord) -> StateResult<()>;

    /// Remove the record after a successful destroy. Removing a missing
    /// name is not an error.
    async fn remove(&self, name: &str) -> StateResult<()>;
}
