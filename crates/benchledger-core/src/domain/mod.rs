//! Domain rules for benchledger ingestion.
//!
//! - `error`: validation, policy and ledger error taxonomy
//! - `validation`: run-report checks at the ingestion boundary

pub mod error;
pub mod validation;

pub use error::{LedgerError, PolicyError, Result, ValidationError};
pub use validation::validate_entry;
