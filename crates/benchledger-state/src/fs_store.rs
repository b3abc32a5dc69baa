//! Filesystem-backed history store.
//!
//! The document lives in a single file (JSON or `data.js` script form,
//! chosen by extension). The version token is the SHA-256 of the file
//! bytes, so any writer that changes the file, including another process,
//! invalidates older snapshots.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::data_js::DocumentFormat;
use crate::error::StorageError;
use crate::schema::Document;
use crate::storage_traits::*;

/// History store persisted to one file with atomic replace-on-write.
pub struct FsHistoryStore {
    path: PathBuf,
    // `None` adopts whatever repository the file belongs to.
    repo_url: Option<String>,
    format: DocumentFormat,
    // Held only across the compare-and-swap in `write`.
    swap: Mutex<()>,
}

impl FsHistoryStore {
    /// Open (or prepare to create) the history file of `repo_url` at `path`.
    ///
    /// `repo_url` seeds the empty document returned while the file does not
    /// exist yet. An existing file that belongs to another repository fails
    /// every read and write with [`StorageError::RepoMismatch`].
    pub fn new(path: impl AsRef<Path>, repo_url: impl Into<String>) -> Self {
        Self::with_repo(path.as_ref(), Some(repo_url.into()))
    }

    /// Open the history file at `path` for whichever repository it belongs
    /// to. A missing file reads as an empty document with no repository.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_repo(path.as_ref(), None)
    }

    fn with_repo(path: &Path, repo_url: Option<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            repo_url,
            format: DocumentFormat::for_path(path),
            swap: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Current bytes on disk, or `None` when the file does not exist.
    fn load_bytes(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn snapshot_of(&self, bytes: Option<Vec<u8>>) -> StorageResult<Snapshot> {
        match bytes {
            Some(bytes) => {
                let document = self.format.decode(&bytes)?;
                if let Some(configured) = &self.repo_url {
                    if document.repo_url != *configured {
                        return Err(StorageError::RepoMismatch {
                            stored: document.repo_url,
                            incoming: configured.clone(),
                        });
                    }
                }
                Ok(Snapshot {
                    document,
                    version: VersionToken::from_bytes(&bytes),
                })
            }
            None => Ok(Snapshot {
                document: Document::empty(self.repo_url.clone().unwrap_or_default()),
                version: VersionToken::absent(),
            }),
        }
    }

    /// Atomic write: temp file in the same directory, then rename.
    fn persist(&self, data: &[u8]) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FsHistoryStore {
    async fn read(&self) -> StorageResult<Snapshot> {
        let bytes = self.load_bytes()?;
        self.snapshot_of(bytes)
    }

    async fn write(
        &self,
        document: &Document,
        expected: &VersionToken,
    ) -> StorageResult<VersionToken> {
        let encoded = self.format.encode(document)?;

        let _guard = self.swap.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.snapshot_of(self.load_bytes()?)?;
        if current.version != *expected {
            return Err(StorageError::ConcurrentModification {
                expected: expected.to_string(),
                actual: current.version.to_string(),
            });
        }
        ensure_same_repo(&current.document, document)?;

        self.persist(&encoded)?;
        let version = VersionToken::from_bytes(&encoded);
        tracing::debug!(
            event = "store.committed",
            path = %self.path.display(),
            version = %version,
            "history file replaced"
        );
        Ok(version)
    }
}
