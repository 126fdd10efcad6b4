//! Provider error taxonomy.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by a provider.
///
/// The split drives the executor's retry decision: transient errors
/// (throttling, eventual-consistency lookups) retry with backoff,
/// everything else fails the entry immediately.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Transient provider error: {0}")]
    Transient(String),

    #[error("Permanent provider error: {0}")]
    Permanent(String),

    #[error("Resource not found: {kind} '{id}'")]
    NotFound { kind: String, id: String },

    #[error("Unsupported lookup kind: {0}")]
    UnsupportedLookup(String),
}

impl ProviderError {
    /// Whether the executor should retry the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Transient("throttled".into()).is_transient());
        assert!(!ProviderError::Permanent("denied".into()).is_transient());
        assert!(!ProviderError::NotFound {
            kind: "network/vpc".into(),
            id: "vpc-1".into()
        }
        .is_transient());
    }
}
