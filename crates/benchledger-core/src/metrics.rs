//! Process-wide ingestion tallies.
//!
//! The merge coordinator bumps these as runs are committed, retried,
//! rejected or raise alerts. A CLI run logs the totals once via
//! [`Metrics::flush`] before exiting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tallies shared by every coordinator in the process.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    ingestions_committed: AtomicU64,
    conflicts_retried: AtomicU64,
    alerts_raised: AtomicU64,
    validation_rejects: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            ingestions_committed: AtomicU64::new(0),
            conflicts_retried: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            validation_rejects: AtomicU64::new(0),
        }
    }

    pub fn inc_committed(&self) {
        self.ingestions_committed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "ingestions_committed", "counter incremented");
    }

    pub fn inc_conflicts(&self) {
        self.conflicts_retried.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "conflicts_retried", "counter incremented");
    }

    /// Count the alerts raised by one committed run.
    pub fn add_alerts(&self, n: u64) {
        if n > 0 {
            self.alerts_raised.fetch_add(n, Ordering::Relaxed);
            tracing::trace!(metric = "alerts_raised", n, "counter incremented");
        }
    }

    pub fn inc_validation_rejects(&self) {
        self.validation_rejects.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validation_rejects", "counter incremented");
    }

    /// Log the ingestion totals so far under `metric = "flush"`.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            ingestions_committed = self.ingestions_committed(),
            conflicts_retried = self.conflicts_retried(),
            alerts_raised = self.alerts_raised(),
            validation_rejects = self.validation_rejects(),
        );
    }

    pub fn ingestions_committed(&self) -> u64 {
        self.ingestions_committed.load(Ordering::Relaxed)
    }

    pub fn conflicts_retried(&self) -> u64 {
        self.conflicts_retried.load(Ordering::Relaxed)
    }

    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised.load(Ordering::Relaxed)
    }

    pub fn validation_rejects(&self) -> u64 {
        self.validation_rejects.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.ingestions_committed.store(0, Ordering::Relaxed);
        self.conflicts_retried.store(0, Ordering::Relaxed);
        self.alerts_raised.store(0, Ordering::Relaxed);
        self.validation_rejects.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_committed();
        m.inc_committed();
        m.inc_conflicts();
        m.add_alerts(3);
        m.add_alerts(0);
        m.inc_validation_rejects();

        assert_eq!(m.ingestions_committed(), 2);
        assert_eq!(m.conflicts_retried(), 1);
        assert_eq!(m.alerts_raised(), 3);
        assert_eq!(m.validation_rejects(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_committed();
        m.add_alerts(2);
        m.reset();
        assert_eq!(m.ingestions_committed(), 0);
        assert_eq!(m.alerts_raised(), 0);
    }
}
