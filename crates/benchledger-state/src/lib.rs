//! benchledger-state: versioned persistence for benchmark history
//!
//! This crate owns the typed benchmark-history document of one repository and
//! the stores that persist it under optimistic concurrency control.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: append-only data, snapshot isolation, compare-and-swap writes.
//!
//! ## Key Components
//!
//! - `Document` / `Entry` / `Measurement`: the persisted history layout
//! - `HistoryStore`: snapshot `read` + compare-and-swap `write`
//! - `MemoryHistoryStore`: in-process store keyed by a generation counter
//! - `FsHistoryStore`: file store keyed by the SHA-256 of the file bytes
//! - `DocumentFormat`: JSON and `window.BENCHMARK_DATA` script encodings

pub mod data_js;
mod error;
pub mod fs_store;
pub mod memory;
mod schema;
pub mod storage_traits;

pub use data_js::DocumentFormat;
pub use error::StorageError;
pub use fs_store::FsHistoryStore;
pub use memory::MemoryHistoryStore;
pub use schema::{
    parse_margin, CommitInfo, Document, Entry, EpochMillis, Identity, Measurement,
};
pub use storage_traits::{HistoryStore, Snapshot, StorageResult, VersionToken};
