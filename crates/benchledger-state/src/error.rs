//! Error types for benchledger-state

use thiserror::Error;

/// Errors that can occur in the history persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// The stored version no longer matches the version the caller read
    #[error("concurrent modification: expected version {expected}, found {actual}")]
    ConcurrentModification { expected: String, actual: String },

    /// Optimistic retries were used up without a successful commit
    #[error("gave up after {attempts} conflicting write attempts")]
    RetriesExhausted { attempts: u32 },

    /// A write tried to change the repository URL of an existing document
    #[error("repository mismatch: store holds {stored}, write carries {incoming}")]
    RepoMismatch { stored: String, incoming: String },

    /// The persisted bytes are not a valid history document
    #[error("malformed history document: {0}")]
    Malformed(String),

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this error is an optimistic-concurrency conflict that a
    /// caller may resolve by re-reading and retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::ConcurrentModification { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = StorageError::ConcurrentModification {
            expected: "gen-1".to_string(),
            actual: "gen-2".to_string(),
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("gen-1"));
    }

    #[test]
    fn other_errors_are_not_conflicts() {
        assert!(!StorageError::RetriesExhausted { attempts: 3 }.is_conflict());
        assert!(!StorageError::Malformed("x".to_string()).is_conflict());
    }
}
