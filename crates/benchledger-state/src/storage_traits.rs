//! Storage trait definitions for benchledger
//!
//! `HistoryStore` owns one repository's [`Document`] and exposes exactly two
//! operations: a snapshot read and a compare-and-swap write. Callers never
//! mutate stored state in place; they compute a new document from a snapshot
//! and hand it back together with the version they read.
//!
//! Backends: [`crate::memory::MemoryHistoryStore`] and
//! [`crate::fs_store::FsHistoryStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::schema::Document;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// VersionToken
// ---------------------------------------------------------------------------

/// Opaque optimistic-concurrency token.
///
/// Two tokens compare equal only when they describe the same stored state.
/// Callers must treat the contents as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken(String);

impl VersionToken {
    /// Token of a store that has never been written.
    pub fn absent() -> Self {
        VersionToken("absent".to_string())
    }

    /// Token derived from a monotonically increasing write counter.
    pub fn from_generation(generation: u64) -> Self {
        VersionToken(format!("gen-{generation}"))
    }

    /// Token derived from the SHA-256 of the persisted bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        VersionToken(format!("sha256-{}", hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable view of the stored document at one version.
///
/// The document is an owned copy: later writes to the store never show up
/// in a snapshot already handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: Document,
    pub version: VersionToken,
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Versioned persistence for one repository's benchmark history.
///
/// Guarantees:
/// - `read()` returns an owned snapshot decoupled from concurrent writers.
/// - `write(doc, expected)` succeeds only when the stored version still
///   equals `expected`; otherwise it returns
///   `StorageError::ConcurrentModification` and changes nothing.
/// - A write that would change the stored `repoUrl` fails with
///   `StorageError::RepoMismatch`.
/// - The store is held exclusively only for the compare-and-swap itself.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Take a snapshot of the current document and its version.
    async fn read(&self) -> StorageResult<Snapshot>;

    /// Replace the document if the stored version equals `expected`.
    /// Returns the version of the newly stored document.
    async fn write(&self, document: &Document, expected: &VersionToken)
        -> StorageResult<VersionToken>;
}

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for std::sync::Arc<T> {
    async fn read(&self) -> StorageResult<Snapshot> {
        (**self).read().await
    }

    async fn write(
        &self,
        document: &Document,
        expected: &VersionToken,
    ) -> StorageResult<VersionToken> {
        (**self).write(document, expected).await
    }
}

/// Reject a write that would change the repository a store belongs to.
pub(crate) fn ensure_same_repo(stored: &Document, incoming: &Document) -> StorageResult<()> {
    if stored.repo_url != incoming.repo_url {
        return Err(StorageError::RepoMismatch {
            stored: stored.repo_url.clone(),
            incoming: incoming.repo_url.clone(),
        });
    }
    Ok(())
}
