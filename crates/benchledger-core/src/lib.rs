//! benchledger core library
//!
//! Regression detection and safe-merge ingestion on top of
//! `benchledger-state`:
//!
//! - [`MergeCoordinator`]: validate → snapshot → evaluate → append → commit,
//!   retried on optimistic-concurrency conflicts
//! - [`RegressionDetector`]: pure per-measurement baseline comparison
//! - [`AlertPolicy`]: thresholds, directions and baseline rules (TOML)
//! - [`ExportView`]: read-only access for chart renderers and notifiers

pub mod coordinator;
pub mod detector;
pub mod domain;
pub mod export;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod summary;
pub mod telemetry;

pub use coordinator::{CoordinatorConfig, IngestOutcome, MergeCoordinator};
pub use detector::{Alert, Decision, OkReason, RegressionDetector, UnitMismatchWarning, Verdict};
pub use domain::{validate_entry, LedgerError, PolicyError, Result, ValidationError};
pub use export::ExportView;
pub use metrics::METRICS;
pub use obs::{
    emit_alert, emit_ingest_committed, emit_ingest_conflict, emit_ingest_started,
    emit_unit_mismatch, emit_validation_rejected, ingest_span,
};
pub use policy::{AlertPolicy, BaselineRule, Direction, MetricOverride, MetricPolicy, Threshold};
pub use summary::render_markdown;
pub use telemetry::init_tracing;

pub use benchledger_state::{
    CommitInfo, Document, DocumentFormat, Entry, FsHistoryStore, HistoryStore, Identity,
    Measurement, MemoryHistoryStore, Snapshot, StorageError, VersionToken,
};
