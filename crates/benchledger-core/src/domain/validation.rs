//! Run-report validation at the ingestion boundary.
//!
//! Downstream code (detector, store) trusts an [`Entry`] only after it has
//! passed [`validate_entry`].

use std::collections::HashSet;

use benchledger_state::Entry;

use super::error::ValidationError;

/// Validate a run report before it is evaluated or appended.
///
/// Checks, in order:
/// 1. `tool` is non-empty.
/// 2. `commit.id` is non-empty.
/// 3. `date` is a positive epoch-millisecond value.
/// 4. There is at least one measurement.
/// 5. Every measurement has a non-empty name, a finite value and a non-empty
///    unit, and no name repeats within the entry.
pub fn validate_entry(tool: &str, entry: &Entry) -> Result<(), ValidationError> {
    if tool.trim().is_empty() {
        return Err(ValidationError::EmptyTool);
    }
    if entry.commit.id.trim().is_empty() {
        return Err(ValidationError::EmptyCommitId);
    }
    if entry.date <= 0 {
        return Err(ValidationError::MissingDate { date: entry.date });
    }
    if entry.benches.is_empty() {
        return Err(ValidationError::NoMeasurements);
    }

    let mut seen = HashSet::with_capacity(entry.benches.len());
    for (index, bench) in entry.benches.iter().enumerate() {
        if bench.name.is_empty() {
            return Err(ValidationError::EmptyMeasurementName { index });
        }
        if !bench.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                name: bench.name.clone(),
            });
        }
        if bench.unit.trim().is_empty() {
            return Err(ValidationError::EmptyUnit {
                name: bench.name.clone(),
            });
        }
        if !seen.insert(bench.name.as_str()) {
            return Err(ValidationError::DuplicateMeasurement {
                name: bench.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchledger_state::{CommitInfo, Identity, Measurement};
    use chrono::DateTime;

    fn entry(id: &str, date: i64, benches: Vec<Measurement>) -> Entry {
        let ts = DateTime::parse_from_rfc3339("2025-03-15T09:57:47+09:00").unwrap();
        Entry::new(
            CommitInfo::new(id, "msg", Identity::new("dev", "dev@example.com"), ts),
            date,
            "cargo",
            benches,
        )
    }

    #[test]
    fn valid_entry_passes() {
        let e = entry("c1", 1000, vec![Measurement::new("fib", 18.0, "ns/iter")]);
        assert!(validate_entry("Bench", &e).is_ok());
    }

    #[test]
    fn empty_measurements_rejected() {
        let e = entry("c1", 1000, vec![]);
        assert_eq!(validate_entry("Bench", &e), Err(ValidationError::NoMeasurements));
    }

    #[test]
    fn duplicate_names_rejected() {
        let e = entry(
            "c1",
            1000,
            vec![
                Measurement::new("fib", 1.0, "ns/iter"),
                Measurement::new("fib", 2.0, "ns/iter"),
            ],
        );
        assert_eq!(
            validate_entry("Bench", &e),
            Err(ValidationError::DuplicateMeasurement {
                name: "fib".to_string()
            })
        );
    }

    #[test]
    fn missing_commit_id_rejected() {
        let e = entry("", 1000, vec![Measurement::new("fib", 1.0, "ns/iter")]);
        assert_eq!(validate_entry("Bench", &e), Err(ValidationError::EmptyCommitId));
    }

    #[test]
    fn zero_date_rejected() {
        let e = entry("c1", 0, vec![Measurement::new("fib", 1.0, "ns/iter")]);
        assert_eq!(
            validate_entry("Bench", &e),
            Err(ValidationError::MissingDate { date: 0 })
        );
    }

    #[test]
    fn nan_value_rejected() {
        let e = entry("c1", 1, vec![Measurement::new("fib", f64::NAN, "ns/iter")]);
        assert!(matches!(
            validate_entry("Bench", &e),
            Err(ValidationError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn empty_unit_and_name_rejected() {
        let e = entry("c1", 1, vec![Measurement::new("fib", 1.0, " ")]);
        assert!(matches!(
            validate_entry("Bench", &e),
            Err(ValidationError::EmptyUnit { .. })
        ));
        let e = entry("c1", 1, vec![Measurement::new("", 1.0, "ns/iter")]);
        assert_eq!(
            validate_entry("Bench", &e),
            Err(ValidationError::EmptyMeasurementName { index: 0 })
        );
    }

    #[test]
    fn empty_tool_rejected() {
        let e = entry("c1", 1, vec![Measurement::new("fib", 1.0, "ns/iter")]);
        assert_eq!(validate_entry("  ", &e), Err(ValidationError::EmptyTool));
    }
}
