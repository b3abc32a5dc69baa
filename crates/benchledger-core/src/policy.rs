//! Alert policy configuration.
//!
//! An [`AlertPolicy`] holds a `default` [`MetricPolicy`] plus per-measurement
//! overrides. Overrides only need to name the fields they change; the rest
//! is inherited from the default. Policies are usually loaded from TOML:
//!
//! ```toml
//! [default]
//! threshold = { kind = "relative", value = 0.2 }
//! baseline = { rule = "rolling_mean", window = 5 }
//!
//! [overrides."tests::bench_fib"]
//! direction = "higher_is_worse"
//! threshold = { kind = "absolute", value = 3.0 }
//! noise_guard = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::PolicyError;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a measurement gets worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Latency-like units: an increase is a regression.
    HigherIsWorse,
    /// Throughput-like units: a decrease is a regression.
    LowerIsWorse,
}

/// Unit fragments that denote a rate, where bigger numbers are better.
const RATE_UNIT_MARKERS: &[&str] = &[
    "ops/s", "op/s", "/sec", "/s", "per second", "hz", "throughput",
];

impl Direction {
    /// Infer the direction from a unit string: rates are lower-is-worse,
    /// everything else (times, sizes, counts per iteration) higher-is-worse.
    pub fn infer_from_unit(unit: &str) -> Self {
        let unit = unit.trim().to_ascii_lowercase();
        if RATE_UNIT_MARKERS.iter().any(|m| unit.ends_with(m) || unit == *m) {
            Direction::LowerIsWorse
        } else {
            Direction::HigherIsWorse
        }
    }

    /// Project a signed change onto the bad direction: positive means worse.
    pub fn badness(self, signed_change: f64) -> f64 {
        match self {
            Direction::HigherIsWorse => signed_change,
            Direction::LowerIsWorse => -signed_change,
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold / BaselineRule
// ---------------------------------------------------------------------------

/// How far in the bad direction a value may move before it alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    /// Fraction of the baseline, e.g. `0.1` for 10%.
    Relative(f64),
    /// Absolute difference in the measurement's unit.
    Absolute(f64),
}

impl Threshold {
    fn amount(self) -> f64 {
        match self {
            Threshold::Relative(v) | Threshold::Absolute(v) => v,
        }
    }
}

/// How the baseline is derived from prior values of the same measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum BaselineRule {
    /// The most recent prior value.
    MostRecent,
    /// Arithmetic mean of the last `window` prior values.
    RollingMean { window: usize },
}

impl BaselineRule {
    /// Number of most recent prior values the rule looks at.
    pub fn window(self) -> usize {
        match self {
            BaselineRule::MostRecent => 1,
            BaselineRule::RollingMean { window } => window,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricPolicy / AlertPolicy
// ---------------------------------------------------------------------------

/// Fully resolved policy for one measurement name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricPolicy {
    /// `None` infers the direction from the measurement unit.
    pub direction: Option<Direction>,
    pub threshold: Threshold,
    pub baseline: BaselineRule,
    /// Downgrade alerts that sit inside the reported error margins to
    /// `Inconclusive`.
    pub noise_guard: bool,
}

impl Default for MetricPolicy {
    /// Alerts when a value is worse than twice the previous one.
    fn default() -> Self {
        Self {
            direction: None,
            threshold: Threshold::Relative(1.0),
            baseline: BaselineRule::MostRecent,
            noise_guard: false,
        }
    }
}

impl MetricPolicy {
    pub fn direction_for(&self, unit: &str) -> Direction {
        self.direction
            .unwrap_or_else(|| Direction::infer_from_unit(unit))
    }
}

/// Per-measurement override; unset fields fall back to the default policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BaselineRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_guard: Option<bool>,
}

/// Regression policy applied by the detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    pub default: MetricPolicy,
    pub overrides: BTreeMap<String, MetricOverride>,
}

impl AlertPolicy {
    /// Policy with the same rule for every measurement.
    pub fn uniform(policy: MetricPolicy) -> Self {
        Self {
            default: policy,
            overrides: BTreeMap::new(),
        }
    }

    /// Shorthand: relative threshold in a fixed direction, most-recent baseline.
    pub fn relative(threshold: f64, direction: Direction) -> Self {
        Self::uniform(MetricPolicy {
            direction: Some(direction),
            threshold: Threshold::Relative(threshold),
            ..MetricPolicy::default()
        })
    }

    /// Add or replace the override for `name`.
    pub fn with_override(mut self, name: impl Into<String>, o: MetricOverride) -> Self {
        self.overrides.insert(name.into(), o);
        self
    }

    /// Resolve the effective policy for one measurement name.
    pub fn for_metric(&self, name: &str) -> MetricPolicy {
        let base = self.default.clone();
        match self.overrides.get(name) {
            None => base,
            Some(o) => MetricPolicy {
                direction: o.direction.or(base.direction),
                threshold: o.threshold.unwrap_or(base.threshold),
                baseline: o.baseline.unwrap_or(base.baseline),
                noise_guard: o.noise_guard.unwrap_or(base.noise_guard),
            },
        }
    }

    /// Parse and validate a TOML policy.
    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: AlertPolicy = toml::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a TOML policy file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject thresholds that are negative or non-finite and empty windows.
    pub fn validate(&self) -> Result<(), PolicyError> {
        check_metric("default", &self.default)?;
        for name in self.overrides.keys() {
            check_metric(name, &self.for_metric(name))?;
        }
        Ok(())
    }
}

fn check_metric(name: &str, policy: &MetricPolicy) -> Result<(), PolicyError> {
    let amount = policy.threshold.amount();
    if !amount.is_finite() || amount < 0.0 {
        return Err(PolicyError::Invalid(format!(
            "{name}: threshold must be a finite non-negative number, got {amount}"
        )));
    }
    if policy.baseline.window() == 0 {
        return Err(PolicyError::Invalid(format!(
            "{name}: rolling_mean window must be at least 1"
        )));
    }
    Ok(())
}
