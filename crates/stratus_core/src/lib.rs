//! # stratus_core
//!
//! Orchestration core for Stratus.
//!
//! Takes a declarative resource manifest and reconciles last-known
//! state to match it, in five stages:
//!
//! - **Graph**: derive the dependency DAG from property references,
//!   rejecting cycles and unknown names.
//! - **Lookups**: resolve read-only provider queries, cached per run.
//! - **Diff**: compare desired properties against the state baseline
//!   into create/update/replace/delete entries.
//! - **Plan**: order entries into waves safe for concurrent execution.
//! - **Execute**: dispatch waves against the provider with bounded
//!   concurrency, retries and per-entry state commits.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stratus_core::{CancelToken, Orchestrator};
//! use stratus_provider::SimProvider;
//! use stratus_state::MemoryStateStore;
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(SimProvider::new()),
//!     Arc::new(MemoryStateStore::new()),
//! );
//! let report = orchestrator.apply(&manifest, CancelToken::new()).await?;
//! ```

pub mod cancel;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod lookup;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod retry;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use diff::{ChangeEntry, ChangeOp, Changeset, DiffEngine};
pub use error::{CoreError, CoreResult};
pub use executor::{Executor, ExecutorOptions};
pub use graph::ResourceGraph;
pub use lookup::LookupResolver;
pub use orchestrator::{Orchestrator, PreparedRun};
pub use plan::{Plan, PlannedEntry, Planner, Wave};
pub use report::{EntryOutcome, EntryReport, RunReport, RunStatus};
pub use retry::RetryPolicy;
