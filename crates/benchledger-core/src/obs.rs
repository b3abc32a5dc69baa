//! Structured observability hooks for the ingestion lifecycle.
//!
//! This module provides:
//! - An ingestion-scoped tracing span via [`ingest_span`]
//! - Emission functions for key lifecycle events: start, conflict, commit,
//!   validation rejection, alert and unit mismatch
//!
//! Events are emitted at `info!`/`warn!` level (filter with `BENCHLEDGER_LOG`).

use tracing::{info, warn};

use crate::detector::{Alert, UnitMismatchWarning};

/// Span tagged with the ingestion id and tool key.
///
/// Attach it with `tracing::Instrument` so it stays valid across awaits.
pub fn ingest_span(ingest_id: &str, tool: &str) -> tracing::Span {
    tracing::info_span!("benchledger.ingest", ingest_id = %ingest_id, tool = %tool)
}

/// Emit event: ingestion started for a commit.
pub fn emit_ingest_started(tool: &str, commit_id: &str, measurements: usize) {
    info!(
        event = "ingest.started",
        tool = %tool,
        commit_id = %commit_id,
        measurements = measurements,
    );
}

/// Emit event: the compare-and-swap lost against a concurrent writer.
pub fn emit_ingest_conflict(attempt: u32, max_attempts: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "ingest.conflict",
        attempt = attempt,
        max_attempts = max_attempts,
        error = %error,
    );
}

/// Emit event: the new entry was committed.
pub fn emit_ingest_committed(version: &str, tool_entries: usize, alerts: usize, attempts: u32) {
    info!(
        event = "ingest.committed",
        version = %version,
        tool_entries = tool_entries,
        alerts = alerts,
        attempts = attempts,
    );
}

/// Emit event: the run report was rejected before touching the store.
pub fn emit_validation_rejected(error: &dyn std::fmt::Display) {
    warn!(event = "ingest.rejected", error = %error);
}

/// Emit event: a measurement regressed past its threshold.
pub fn emit_alert(alert: &Alert) {
    warn!(
        event = "detector.alert",
        name = %alert.name,
        baseline = alert.baseline,
        new_value = alert.new_value,
        ratio = alert.ratio,
    );
}

/// Emit event: a measurement changed unit since it was last recorded.
pub fn emit_unit_mismatch(warning: &UnitMismatchWarning) {
    warn!(
        event = "detector.unit_mismatch",
        name = %warning.name,
        previous_unit = %warning.previous_unit,
        unit = %warning.unit,
    );
}
