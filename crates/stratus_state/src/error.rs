//! Error types for the state store.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading or writing state.
///
/// Any of these is fatal for a run: a completed apply must never be
/// silently lost, so the executor aborts instead of continuing past a
/// failed write.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State record not found: {0}")]
    RecordNotFound(String),

    #[error("Corrupt state record at {path}: {message}")]
    CorruptRecord { path: String, message: String },

    #[error("State write failed for '{name}': {message}")]
    WriteFailed { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
