//! Error types for the orchestration core.

use stratus_provider::ProviderError;
use stratus_spec::SpecError;
use stratus_state::StateError;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building, planning or executing a run.
///
/// Everything here is fatal for the run: configuration errors surface
/// before any side effect, state errors abort mid-run rather than risk
/// losing a completed apply. Per-entry provider failures are *not*
/// errors — they are reported in the [`RunReport`](crate::RunReport).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Dependency cycle involving: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("Resource '{node}' references unknown name '{reference}'")]
    MissingReference { node: String, reference: String },

    #[error("Duplicate logical name: {0}")]
    DuplicateName(String),

    #[error("Manifest validation failed: {0}")]
    InvalidManifest(String),

    #[error("Lookup '{name}' failed: {source}")]
    LookupFailed {
        name: String,
        #[source]
        source: ProviderError,
    },

    #[error("Executor task failed: {0}")]
    TaskFailed(String),

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("State store error: {0}")]
    State(#[from] StateError),
}
