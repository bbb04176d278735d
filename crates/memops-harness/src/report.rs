//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Copier under test.
    pub candidate: String,
    /// Copier the candidate was compared against.
    pub reference: String,
    /// Fill sweep name.
    pub fill: String,
    pub shards: u64,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Candidate: {}\n", self.candidate));
        out.push_str(&format!("- Reference: {}\n", self.reference));
        out.push_str(&format!("- Fill sweep: {}\n", self.fill));
        out.push_str(&format!("- Shards: {}\n", self.shards));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Cases passed: {}\n", self.summary.cases_passed));
        out.push_str(&format!(
            "- Verdict: {}\n\n",
            if self.summary.all_passed() { "PASS" } else { "FAIL" }
        ));

        out.push_str("| Space | Planned | Passed | Status |\n");
        out.push_str("|-------|---------|--------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.case_name, r.cases_planned, r.cases_passed, status
            ));
        }

        for r in self.summary.results.iter().filter(|r| !r.passed) {
            out.push_str(&format!("\n## {}\n\n", r.case_name));
            if let Some(failure) = &r.failure {
                out.push_str(&format!("{}\n", failure.message));
            }
            if let Some(diff) = &r.diff {
                out.push_str("\n```diff\n");
                out.push_str(diff);
                if !diff.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```\n");
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
