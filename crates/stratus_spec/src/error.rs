//! Error types for the manifest model.

use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while loading or validating a manifest.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Unsupported manifest format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error("Manifest validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
