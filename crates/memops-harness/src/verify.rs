//! Per-space verification results.

use memops_abi::Mismatch;
use serde::{Deserialize, Serialize};

/// Serializable copy of a [`Mismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchRecord {
    pub ordinal: u64,
    pub space: String,
    pub len: usize,
    pub src_offset: usize,
    pub dst_offset: usize,
    pub fill: u8,
    /// Failure class, e.g. `out_of_bounds`.
    pub kind: String,
    pub message: String,
}

impl From<&Mismatch> for MismatchRecord {
    fn from(mismatch: &Mismatch) -> Self {
        Self {
            ordinal: mismatch.case.ordinal,
            space: mismatch.space.map_or_else(
                || format!("space {}", mismatch.case.space_index),
                |kind| kind.name().to_string(),
            ),
            len: mismatch.case.len,
            src_offset: mismatch.case.src_offset,
            dst_offset: mismatch.case.dst_offset,
            fill: mismatch.case.fill,
            kind: mismatch.kind.label().to_string(),
            message: mismatch.to_string(),
        }
    }
}

/// Result of verifying one memory space (or one seed scenario).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the space or scenario.
    pub case_name: String,
    /// Whether every case passed.
    pub passed: bool,
    /// Cases selected for this space.
    pub cases_planned: u64,
    /// Cases that passed before the run ended.
    pub cases_passed: u64,
    /// First failing case, if any.
    pub failure: Option<MismatchRecord>,
    /// Hex diff of the destination buffers at the failure.
    pub diff: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Passing cases across all results.
    pub cases_passed: u64,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        let cases_passed = results.iter().map(|r| r.cases_passed).sum();
        Self {
            total,
            passed,
            failed,
            cases_passed,
            results,
        }
    }

    /// Returns true if all results passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// The first recorded failure.
    #[must_use]
    pub fn first_failure(&self) -> Option<&MismatchRecord> {
        self.results.iter().find_map(|r| r.failure.as_ref())
    }
}
