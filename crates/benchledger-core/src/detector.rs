//! Regression detector.
//!
//! Compares every measurement of a new [`Entry`] against the prior history of
//! the same tool and produces one [`Decision`] per measurement. The detector
//! is pure: it reads only its arguments and the policy, performs no I/O and
//! emits nothing. Callers log or forward decisions themselves.

use benchledger_state::{Entry, Measurement};
use serde::{Deserialize, Serialize};

use crate::policy::{AlertPolicy, Direction, MetricPolicy, Threshold};

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// A measurement that moved past its threshold in the bad direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub name: String,
    pub baseline: f64,
    pub new_value: f64,
    /// Signed `(new_value - baseline) / |baseline|`.
    pub ratio: f64,
}

/// The unit of a measurement differs from the unit last recorded under the
/// same name. Carried alongside the numeric verdict; never blocks ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMismatchWarning {
    pub name: String,
    pub previous_unit: String,
    pub unit: String,
}

/// Why a measurement was judged fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum OkReason {
    /// First appearance of this name for the tool.
    InsufficientHistory,
    /// Compared against a baseline and stayed within the threshold.
    WithinThreshold { baseline: f64, ratio: f64 },
    /// The baseline is zero, so no ratio can be formed.
    ZeroBaseline,
}

/// Outcome of evaluating one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Ok(OkReason),
    Alert(Alert),
    /// Would alert, but the change sits inside the reported error margins.
    Inconclusive(Alert),
}

/// Per-measurement decision returned to the caller of an ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Tool key the measurement was recorded under.
    pub tool: String,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub direction: Direction,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_mismatch: Option<UnitMismatchWarning>,
    /// Commit of the most recent prior entry carrying this measurement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_commit: Option<String>,
}

impl Decision {
    pub fn is_alert(&self) -> bool {
        matches!(self.verdict, Verdict::Alert(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.verdict, Verdict::Ok(_))
    }

    pub fn alert(&self) -> Option<&Alert> {
        match &self.verdict {
            Verdict::Alert(a) => Some(a),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Baseline-comparison regression detector bound to one policy.
#[derive(Debug, Clone, Copy)]
pub struct RegressionDetector<'p> {
    policy: &'p AlertPolicy,
}

impl<'p> RegressionDetector<'p> {
    pub fn new(policy: &'p AlertPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate every measurement of `entry` against `prior`, the append-ordered
    /// history already recorded for `tool`. Decisions come back in the
    /// entry's measurement order.
    pub fn evaluate(&self, tool: &str, entry: &Entry, prior: &[Entry]) -> Vec<Decision> {
        entry
            .benches
            .iter()
            .map(|m| self.evaluate_one(tool, m, prior))
            .collect()
    }

    fn evaluate_one(&self, tool: &str, m: &Measurement, prior: &[Entry]) -> Decision {
        let policy = self.policy.for_metric(&m.name);
        let direction = policy.direction_for(&m.unit);

        let history: Vec<(&Entry, &Measurement)> = prior
            .iter()
            .filter_map(|e| e.bench(&m.name).map(|p| (e, p)))
            .collect();

        let mut decision = Decision {
            tool: tool.to_string(),
            name: m.name.clone(),
            value: m.value,
            unit: m.unit.clone(),
            direction,
            verdict: Verdict::Ok(OkReason::InsufficientHistory),
            unit_mismatch: None,
            previous_commit: None,
        };

        let Some((latest_entry, latest)) = history.last() else {
            return decision;
        };
        decision.previous_commit = Some(latest_entry.commit.id.clone());
        if latest.unit != m.unit {
            decision.unit_mismatch = Some(UnitMismatchWarning {
                name: m.name.clone(),
                previous_unit: latest.unit.clone(),
                unit: m.unit.clone(),
            });
        }

        let window_len = policy.baseline.window().min(history.len());
        let window = &history[history.len() - window_len..];
        let baseline = mean(window.iter().map(|(_, p)| p.value));

        decision.verdict = judge(m, baseline, direction, &policy, window);
        decision
    }
}

/// Running mean that stays finite for any finite inputs.
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    values.zip(1u32..).fold(0.0, |acc, (v, k)| {
        let k = f64::from(k);
        acc + v / k - acc / k
    })
}

fn judge(
    m: &Measurement,
    baseline: f64,
    direction: Direction,
    policy: &MetricPolicy,
    window: &[(&Entry, &Measurement)],
) -> Verdict {
    if baseline == 0.0 {
        return Verdict::Ok(OkReason::ZeroBaseline);
    }

    let delta = m.value - baseline;
    let ratio = delta / baseline.abs();
    let exceeded = match policy.threshold {
        Threshold::Relative(limit) => direction.badness(ratio) > limit,
        Threshold::Absolute(limit) => direction.badness(delta) > limit,
    };
    if !exceeded {
        return Verdict::Ok(OkReason::WithinThreshold { baseline, ratio });
    }

    let alert = Alert {
        name: m.name.clone(),
        baseline,
        new_value: m.value,
        ratio,
    };

    if policy.noise_guard && within_noise(m, baseline, window) {
        return Verdict::Inconclusive(alert);
    }
    Verdict::Alert(alert)
}

/// Whether `m` lies inside the union of `[baseline ± margin]` intervals for
/// the margins reported by `m` itself and by the baseline window. Requires
/// `m` to carry a margin.
fn within_noise(m: &Measurement, baseline: f64, window: &[(&Entry, &Measurement)]) -> bool {
    let Some(own) = m.margin() else {
        return false;
    };
    let widest = window
        .iter()
        .filter_map(|(_, p)| p.margin())
        .fold(own, f64::max);
    (m.value - baseline).abs() <= widest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{BaselineRule, MetricPolicy};
    use benchledger_state::{CommitInfo, Identity};
    use chrono::DateTime;

    fn entry(id: &str, benches: Vec<Measurement>) -> Entry {
        let ts = DateTime::parse_from_rfc3339("2025-03-15T09:57:47+09:00").unwrap();
        Entry::new(
            CommitInfo::new(id, "msg", Identity::new("dev", "dev@example.com"), ts),
            1,
            "cargo",
            benches,
        )
    }

    fn ns(name: &str, value: f64) -> Measurement {
        Measurement::new(name, value, "ns/iter")
    }

    fn ten_percent() -> AlertPolicy {
        AlertPolicy::relative(0.10, Direction::HigherIsWorse)
    }

    #[test]
    fn first_appearance_is_insufficient_history() {
        let policy = ten_percent();
        let d = RegressionDetector::new(&policy).evaluate("Bench", &entry("c1", vec![ns("fib", 1e9)]), &[]);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].verdict, Verdict::Ok(OkReason::InsufficientHistory));
        assert!(d[0].previous_commit.is_none());
    }

    #[test]
    fn threshold_boundary() {
        let policy = ten_percent();
        let detector = RegressionDetector::new(&policy);
        let prior = vec![entry("c1", vec![ns("fib", 100.0)])];

        let ok = detector.evaluate("Bench", &entry("c2", vec![ns("fib", 109.0)]), &prior);
        assert!(ok[0].is_ok());

        let bad = detector.evaluate("Bench", &entry("c2", vec![ns("fib", 111.0)]), &prior);
        let alert = bad[0].alert().expect("alert");
        assert_eq!(alert.baseline, 100.0);
        assert_eq!(alert.new_value, 111.0);
        assert!((alert.ratio - 0.11).abs() < 1e-12);
        assert_eq!(bad[0].previous_commit.as_deref(), Some("c1"));
    }

    #[test]
    fn improvement_never_alerts() {
        let policy = ten_percent();
        let prior = vec![entry("c1", vec![ns("fib", 100.0)])];
        let d = RegressionDetector::new(&policy).evaluate("Bench", &entry("c2", vec![ns("fib", 10.0)]), &prior);
        assert!(d[0].is_ok());
    }

    #[test]
    fn lower_is_worse_alerts_on_drop() {
        let policy = AlertPolicy::relative(0.10, Direction::LowerIsWorse);
        let prior = vec![entry("c1", vec![Measurement::new("tput", 1000.0, "ops/sec")])];
        let detector = RegressionDetector::new(&policy);

        let drop = detector.evaluate("B", &entry("c2", vec![Measurement::new("tput", 850.0, "ops/sec")]), &prior);
        assert!(drop[0].is_alert());
        assert!(drop[0].alert().unwrap().ratio < 0.0);

        let rise = detector.evaluate("B", &entry("c2", vec![Measurement::new("tput", 2000.0, "ops/sec")]), &prior);
        assert!(rise[0].is_ok());
    }

    #[test]
    fn inferred_direction_for_rates() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            threshold: Threshold::Relative(0.1),
            ..MetricPolicy::default()
        });
        let prior = vec![entry("c1", vec![Measurement::new("tput", 1000.0, "MB/s")])];
        let d = RegressionDetector::new(&policy).evaluate(
            "B",
            &entry("c2", vec![Measurement::new("tput", 500.0, "MB/s")]),
            &prior,
        );
        assert_eq!(d[0].direction, Direction::LowerIsWorse);
        assert!(d[0].is_alert());
    }

    #[test]
    fn rolling_mean_baseline() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            direction: Some(Direction::HigherIsWorse),
            threshold: Threshold::Relative(0.10),
            baseline: BaselineRule::RollingMean { window: 3 },
            noise_guard: false,
        });
        let prior = vec![
            entry("c0", vec![ns("fib", 1000.0)]),
            entry("c1", vec![ns("fib", 90.0)]),
            entry("c2", vec![ns("fib", 100.0)]),
            entry("c3", vec![ns("fib", 110.0)]),
        ];
        let d = RegressionDetector::new(&policy).evaluate("B", &entry("c4", vec![ns("fib", 115.0)]), &prior);
        // mean of the last three = 100, so 115 is a 15% regression
        let alert = d[0].alert().expect("alert");
        assert!((alert.baseline - 100.0).abs() < 1e-9);
    }

    #[test]
    fn rolling_mean_with_short_history_uses_what_exists() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            direction: Some(Direction::HigherIsWorse),
            threshold: Threshold::Relative(0.10),
            baseline: BaselineRule::RollingMean { window: 10 },
            noise_guard: false,
        });
        let prior = vec![entry("c1", vec![ns("fib", 100.0)]), entry("c2", vec![ns("fib", 120.0)])];
        let d = RegressionDetector::new(&policy).evaluate("B", &entry("c3", vec![ns("fib", 115.0)]), &prior);
        assert_eq!(
            d[0].verdict,
            Verdict::Ok(OkReason::WithinThreshold {
                baseline: 110.0,
                ratio: 5.0 / 110.0
            })
        );
    }

    #[test]
    fn rolling_mean_of_huge_values_still_alerts() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            direction: Some(Direction::HigherIsWorse),
            threshold: Threshold::Relative(0.01),
            baseline: BaselineRule::RollingMean { window: 3 },
            noise_guard: false,
        });
        let big = 1.5e308;
        let prior = vec![
            entry("c1", vec![ns("fib", big)]),
            entry("c2", vec![ns("fib", big)]),
            entry("c3", vec![ns("fib", big)]),
        ];
        let d = RegressionDetector::new(&policy).evaluate("B", &entry("c4", vec![ns("fib", f64::MAX)]), &prior);
        let alert = d[0].alert().expect("alert");
        assert!(alert.baseline.is_finite());
        assert!((alert.baseline - big).abs() / big < 1e-12);
        assert!(alert.ratio.is_finite() && alert.ratio > 0.1);
    }

    #[test]
    fn absolute_threshold() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            direction: Some(Direction::HigherIsWorse),
            threshold: Threshold::Absolute(5.0),
            ..MetricPolicy::default()
        });
        let prior = vec![entry("c1", vec![ns("fib", 100.0)])];
        let detector = RegressionDetector::new(&policy);
        assert!(detector.evaluate("B", &entry("c2", vec![ns("fib", 105.0)]), &prior)[0].is_ok());
        assert!(detector.evaluate("B", &entry("c2", vec![ns("fib", 105.5)]), &prior)[0].is_alert());
    }

    #[test]
    fn unit_change_is_flagged_but_still_judged() {
        let policy = ten_percent();
        let prior = vec![entry("c1", vec![ns("fib", 100.0)])];
        let d = RegressionDetector::new(&policy).evaluate(
            "B",
            &entry("c2", vec![Measurement::new("fib", 200.0, "us/iter")]),
            &prior,
        );
        let warning = d[0].unit_mismatch.as_ref().expect("warning");
        assert_eq!(warning.previous_unit, "ns/iter");
        assert_eq!(warning.unit, "us/iter");
        assert!(d[0].is_alert());
    }

    #[test]
    fn zero_baseline_is_ok() {
        let policy = ten_percent();
        let prior = vec![entry("c1", vec![ns("fib", 0.0)])];
        let d = RegressionDetector::new(&policy).evaluate("B", &entry("c2", vec![ns("fib", 5.0)]), &prior);
        assert_eq!(d[0].verdict, Verdict::Ok(OkReason::ZeroBaseline));
    }

    #[test]
    fn baseline_skips_entries_without_the_name() {
        let policy = ten_percent();
        let prior = vec![
            entry("c1", vec![ns("fib", 100.0)]),
            entry("c2", vec![ns("other", 1.0)]),
        ];
        let d = RegressionDetector::new(&policy).evaluate("B", &entry("c3", vec![ns("fib", 150.0)]), &prior);
        assert!(d[0].is_alert());
        assert_eq!(d[0].previous_commit.as_deref(), Some("c1"));
    }

    #[test]
    fn noise_guard_is_off_by_default() {
        let policy = ten_percent();
        let prior = vec![entry("c1", vec![ns("fib", 100.0).with_range("± 50")])];
        let d = RegressionDetector::new(&policy).evaluate(
            "B",
            &entry("c2", vec![ns("fib", 120.0).with_range("± 50")]),
            &prior,
        );
        assert!(d[0].is_alert());
    }

    #[test]
    fn noise_guard_downgrades_to_inconclusive() {
        let policy = AlertPolicy::uniform(MetricPolicy {
            direction: Some(Direction::HigherIsWorse),
            threshold: Threshold::Relative(0.10),
            noise_guard: true,
            ..MetricPolicy::default()
        });
        let detector = RegressionDetector::new(&policy);
        let prior = vec![entry("c1", vec![ns("fib", 100.0).with_range("± 25")])];

        let noisy = detector.evaluate("B", &entry("c2", vec![ns("fib", 120.0).with_range("± 2")]), &prior);
        assert!(matches!(noisy[0].verdict, Verdict::Inconclusive(_)));

        let real = detector.evaluate("B", &entry("c2", vec![ns("fib", 130.0).with_range("± 2")]), &prior);
        assert!(real[0].is_alert());

        // no margin on the new value: the guard does not apply
        let bare = detector.evaluate("B", &entry("c2", vec![ns("fib", 120.0)]), &prior);
        assert!(bare[0].is_alert());
    }

    #[test]
    fn one_decision_per_measurement_in_order() {
        let policy = ten_percent();
        let prior = vec![entry("c1", vec![ns("a", 1.0), ns("b", 1.0)])];
        let d = RegressionDetector::new(&policy).evaluate(
            "B",
            &entry("c2", vec![ns("b", 5.0), ns("new", 1.0), ns("a", 1.0)]),
            &prior,
        );
        let names: Vec<_> = d.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "new", "a"]);
        assert!(d[0].is_alert());
        assert_eq!(d[1].verdict, Verdict::Ok(OkReason::InsufficientHistory));
        assert!(d[2].is_ok());
    }
}
