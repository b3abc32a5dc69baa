//! Merge coordinator: the single ingestion operation.
//!
//! Each attempt runs `validate → snapshot → evaluate → append → commit`.
//! The commit is a compare-and-swap against the version read in the same
//! attempt; on conflict the whole attempt is rerun against a fresh
//! snapshot, up to [`CoordinatorConfig::max_attempts`]. Nothing is written
//! before the final swap, so a failed attempt leaves the store untouched.

use benchledger_state::{Document, Entry, HistoryStore, StorageError, VersionToken};
use tracing::Instrument;
use uuid::Uuid;

use crate::detector::{Alert, Decision, RegressionDetector};
use crate::domain::{validate_entry, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::policy::AlertPolicy;

/// Retry bound for optimistic-concurrency conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl CoordinatorConfig {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Result of a committed ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// The document as committed by this ingestion.
    pub document: Document,
    /// Version token of the committed document.
    pub version: VersionToken,
    /// One decision per measurement, in report order.
    pub decisions: Vec<Decision>,
    /// Attempts used, 1 when there was no conflict.
    pub attempts: u32,
}

impl IngestOutcome {
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.decisions.iter().filter_map(Decision::alert)
    }

    pub fn has_alerts(&self) -> bool {
        self.decisions.iter().any(Decision::is_alert)
    }
}

/// Orchestrates ingestion of run reports into one repository's store.
pub struct MergeCoordinator<S> {
    store: S,
    config: CoordinatorConfig,
}

impl<S> MergeCoordinator<S>
where
    S: HistoryStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, config: CoordinatorConfig) -> Self {
        Self {
            store,
            config: CoordinatorConfig::with_max_attempts(config.max_attempts),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// Append `entry` to `tool`'s history and return the decisions for its
    /// measurements.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Policy`: the policy fails validation.
    /// - `LedgerError::Validation`: the report is malformed; nothing is read
    ///   or written.
    /// - `LedgerError::Storage(RetriesExhausted)`: every attempt lost the
    ///   compare-and-swap.
    /// - `LedgerError::Storage(_)`: the store failed; nothing is committed.
    pub async fn ingest(
        &self,
        tool: &str,
        entry: Entry,
        policy: &AlertPolicy,
    ) -> Result<IngestOutcome> {
        let ingest_id = Uuid::new_v4().to_string();
        let span = obs::ingest_span(&ingest_id, tool);
        self.ingest_inner(tool, entry, policy).instrument(span).await
    }

    async fn ingest_inner(
        &self,
        tool: &str,
        entry: Entry,
        policy: &AlertPolicy,
    ) -> Result<IngestOutcome> {
        policy.validate()?;
        obs::emit_ingest_started(tool, &entry.commit.id, entry.benches.len());

        let detector = RegressionDetector::new(policy);
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            if let Err(e) = validate_entry(tool, &entry) {
                obs::emit_validation_rejected(&e);
                METRICS.inc_validation_rejects();
                return Err(e.into());
            }

            let snapshot = self.store.read().await?;
            let decisions = detector.evaluate(tool, &entry, snapshot.document.tool_history(tool));
            let next = snapshot.document.with_entry(tool, entry.clone());

            match self.store.write(&next, &snapshot.version).await {
                Ok(version) => {
                    let outcome = IngestOutcome {
                        document: next,
                        version,
                        decisions,
                        attempts: attempt,
                    };
                    record_committed(tool, &outcome);
                    return Ok(outcome);
                }
                Err(e) if e.is_conflict() => {
                    obs::emit_ingest_conflict(attempt, max_attempts, &e);
                    METRICS.inc_conflicts();
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::RetriesExhausted {
            attempts: max_attempts,
        }
        .into())
    }
}

fn record_committed(tool: &str, outcome: &IngestOutcome) {
    let mut alerts = 0u64;
    for decision in &outcome.decisions {
        if let Some(warning) = &decision.unit_mismatch {
            obs::emit_unit_mismatch(warning);
        }
        if let Some(alert) = decision.alert() {
            obs::emit_alert(alert);
            alerts += 1;
        }
    }
    METRICS.inc_committed();
    METRICS.add_alerts(alerts);
    obs::emit_ingest_committed(
        outcome.version.as_str(),
        outcome.document.tool_history(tool).len(),
        alerts as usize,
        outcome.attempts,
    );
}
