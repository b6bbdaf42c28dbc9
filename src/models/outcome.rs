//! Aggregation results and failure reports.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::models::CourtStatus;

/// A source whose pipeline failed during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub court_id: u32,
    pub source_url: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Summary of an aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOutcome {
    /// Records within the window, sorted by date desc, court asc, case number asc
    pub records: Vec<CourtStatus>,

    /// Per-source failures, sorted by court then URL
    pub failures: Vec<SourceFailure>,

    /// Number of (court, source) pipelines run
    pub source_total: usize,

    /// Drafts dropped by the normalizer
    pub rejected: usize,

    /// Valid records dropped for falling outside the window
    pub out_of_window: usize,
}

impl AggregateOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Records flagged for manual review.
    pub fn low_confidence(&self) -> usize {
        self.records.iter().filter(|r| r.needs_review()).count()
    }
}
