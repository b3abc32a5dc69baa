//! In-memory history store
//!
//! `MemoryHistoryStore` keeps the document behind a `Mutex` together with a
//! generation counter that serves as its version token. Used for tests and
//! for embedding the engine in a long-running process.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::Document;
use crate::storage_traits::*;

#[derive(Debug)]
struct State {
    document: Document,
    generation: u64,
}

/// In-memory store backed by a single `Mutex<(Document, generation)>`.
#[derive(Debug)]
pub struct MemoryHistoryStore {
    state: Mutex<State>,
}

impl MemoryHistoryStore {
    /// Start from an empty history for `repo_url`.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self::with_document(Document::empty(repo_url))
    }

    /// Start from an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            state: Mutex::new(State {
                document,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave a half-written
        // document: the swap below is a single assignment.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn read(&self) -> StorageResult<Snapshot> {
        let state = self.lock();
        Ok(Snapshot {
            document: state.document.clone(),
            version: VersionToken::from_generation(state.generation),
        })
    }

    async fn write(
        &self,
        document: &Document,
        expected: &VersionToken,
    ) -> StorageResult<VersionToken> {
        let mut state = self.lock();
        let current = VersionToken::from_generation(state.generation);
        if current != *expected {
            return Err(StorageError::ConcurrentModification {
                expected: expected.to_string(),
                actual: current.to_string(),
            });
        }
        ensure_same_repo(&state.document, document)?;

        state.document = document.clone();
        state.generation += 1;
        let version = VersionToken::from_generation(state.generation);
        tracing::debug!(event = "store.committed", version = %version, "memory store swapped");
        Ok(version)
    }
}
