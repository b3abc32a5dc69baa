//! Error taxonomy for benchledger ingestion.

use benchledger_state::StorageError;

/// Errors produced by run-report validation. A report that fails validation
/// never reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("tool key must not be empty")]
    EmptyTool,

    #[error("run report has no measurements")]
    NoMeasurements,

    #[error("measurement #{index} has an empty name")]
    EmptyMeasurementName { index: usize },

    #[error("duplicate measurement name: {name}")]
    DuplicateMeasurement { name: String },

    #[error("measurement {name} has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("measurement {name} has an empty unit")]
    EmptyUnit { name: String },

    #[error("commit id must not be empty")]
    EmptyCommitId,

    #[error("ingestion date missing or not positive: {date}")]
    MissingDate { date: i64 },
}

/// Errors produced while loading or checking an alert policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid alert policy: {0}")]
    Invalid(String),

    #[error("failed to parse alert policy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level benchledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for benchledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
