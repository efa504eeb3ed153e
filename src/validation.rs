//! Dataset self-consistency check.
//!
//! Given the normalizer contract every record carries a boolean
//! `unauthorized`, so the check should always pass; it exists to catch a
//! future contract violation and is re-derived from the current dataset on
//! every replacement, never cached.

use serde::{Deserialize, Serialize};

use crate::ingest::TelemetryRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub authorized: usize,
    pub unauthorized: usize,
    pub passed: bool,
}

pub fn validate(dataset: &[TelemetryRecord]) -> ValidationReport {
    let total = dataset.len();
    let unauthorized = dataset.iter().filter(|r| r.unauthorized).count();
    let authorized = dataset.iter().filter(|r| !r.unauthorized).count();

    ValidationReport {
        total,
        authorized,
        unauthorized,
        passed: authorized + unauthorized == total,
    }
}
