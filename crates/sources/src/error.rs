//! Errors raised at the boundary of a backing store.

use thiserror::Error;

/// Failure talking to one of the three backing stores.
///
/// Clients recover from these locally (their stage degrades to an empty
/// result); the orchestrator only looks at the variant to tag *why* a
/// stage came back empty.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Connection refused, dropped, or the store reported itself unhealthy
    #[error("{backend} is unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The store did not answer within the configured per-call timeout
    #[error("{backend} timed out")]
    Timeout { backend: String },

    /// The store rejected or failed the query
    #[error("{backend} query failed: {reason}")]
    Query { backend: String, reason: String },

    /// The store answered, but with data the pipeline cannot use
    #[error("{backend} returned invalid data: {reason}")]
    InvalidData { backend: String, reason: String },
}

/// A set of stored embeddings that cannot be averaged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding has zero dimensions")]
    ZeroDimension,

    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl SourceError {
    pub fn unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    pub fn query(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Query {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_data(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidData {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    /// True for connection, timeout and query failures.
    ///
    /// `InvalidData` is excluded: the store was reachable, so an empty
    /// result caused by it is an unexpected failure rather than an outage.
    pub fn is_backend_failure(&self) -> bool {
        !matches!(self, Self::InvalidData { .. })
    }

    /// Name of the store that failed
    pub fn backend(&self) -> &str {
        match self {
            Self::Unavailable { backend, .. }
            | Self::Timeout { backend }
            | Self::Query { backend, .. }
            | Self::InvalidData { backend, .. } => backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_message() {
        let err = EmbeddingError::DimensionMismatch { expected: 384, found: 3 };
        assert_eq!(err.to_string(), "embedding dimension mismatch: expected 384, found 3");
        let wrapped = SourceError::invalid_data("vector_index", err);
        assert!(matches!(wrapped, SourceError::InvalidData { ref reason, .. } if reason.contains("384")));
    }

    #[test]
    fn test_classification() {
        assert!(SourceError::unavailable("graph", "refused").is_backend_failure());
        assert!(SourceError::Timeout { backend: "graph".into() }.is_backend_failure());
        assert!(SourceError::query("graph", "syntax").is_backend_failure());
        assert!(!SourceError::invalid_data("graph", "bad").is_backend_failure());
    }

    #[test]
    fn test_display_names_backend() {
        let err = SourceError::unavailable("vector_index", "connection refused");
        assert_eq!(err.to_string(), "vector_index is unavailable: connection refused");
        assert_eq!(err.backend(), "vector_index");
    }
}
