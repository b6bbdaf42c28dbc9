//! Canonical court status record.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DraftWarning;

/// Publication format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceFormat {
    Html,
    Pdf,
    Image,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Html => "HTML",
            SourceFormat::Pdf => "PDF",
            SourceFormat::Image => "IMAGE",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated pending status ("estado pendiente") published by a court.
///
/// Only the normalizer builds these; everything downstream reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtStatus {
    /// Identifier, unique within a court and extraction batch
    pub id: String,

    /// Configured court identifier
    pub court_id: u32,

    /// Case file identifier ("expediente")
    pub case_number: String,

    /// Court business date of publication
    pub date: NaiveDate,

    /// Procedural track name
    pub case_type: String,

    /// Kind of judicial action (auto, sentencia, ...)
    pub status_type: String,

    /// Narrative of the action taken
    pub description: String,

    /// Format the record was extracted from
    pub source_format: SourceFormat,

    /// Originating resource locator
    pub source_url: String,

    /// Soft extraction warnings carried over from the draft
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DraftWarning>,
}

impl CourtStatus {
    /// Whether the record should be flagged for manual review.
    pub fn needs_review(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DraftWarning::LowConfidenceExtraction { .. }))
    }
}
