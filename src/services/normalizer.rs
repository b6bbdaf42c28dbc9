// src/services/normalizer.rs

//! Draft-to-canonical conversion.
//!
//! The only place loosely-typed extractor output becomes a `CourtStatus`.
//! A draft either passes every check or is rejected with a reason; nothing
//! is passed through half-filled.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::Rejection;
use crate::models::{Config, CourtStatus, DraftField, DraftRecord};
use crate::utils::text::{fold_label, normalize_whitespace};

/// Placeholder for optional classification fields the source left out.
pub const UNSPECIFIED: &str = "No especificado";

static SPANISH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s+de\s+(\p{L}+)\s+del?\s+(\d{4})$").expect("valid date regex")
});

const MONTHS: [(&str, u32); 13] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// Validates drafts against the configured courts and date formats.
#[derive(Debug, Clone)]
pub struct Normalizer {
    court_ids: BTreeSet<u32>,
    date_formats: Vec<String>,
}

impl Normalizer {
    pub fn new(court_ids: impl IntoIterator<Item = u32>, date_formats: Vec<String>) -> Self {
        Self {
            court_ids: court_ids.into_iter().collect(),
            date_formats,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.court_ids(), config.normalize.date_formats.clone())
    }

    /// Build the canonical record for a draft published by `court_id`.
    pub fn normalize(&self, draft: &DraftRecord, court_id: u32) -> Result<CourtStatus, Rejection> {
        if !self.court_ids.contains(&court_id) {
            return Err(Rejection::InvalidCourt(court_id));
        }

        let case_number = required(draft, DraftField::CaseNumber)?;
        let raw_date = required(draft, DraftField::Date)?;
        let date = self
            .parse_date(&raw_date)
            .ok_or(Rejection::InvalidDate(raw_date))?;
        let description = required(draft, DraftField::Description)?;

        // "s" keeps synthesized ids apart from published ones
        let id = match optional(draft, DraftField::Id) {
            Some(id) => format!("{court_id}-{id}"),
            None => format!("{court_id}-s{}", draft.sequence),
        };

        Ok(CourtStatus {
            id,
            court_id,
            case_number,
            date,
            case_type: optional(draft, DraftField::CaseType).unwrap_or_else(|| UNSPECIFIED.into()),
            status_type: optional(draft, DraftField::StatusType)
                .unwrap_or_else(|| UNSPECIFIED.into()),
            description,
            source_format: draft.source_format,
            source_url: draft.source_url.clone(),
            warnings: draft.warnings.clone(),
        })
    }

    /// Parse a published date under the configured formats.
    ///
    /// Also accepts an ISO datetime (the date part is kept) and long Spanish
    /// dates such as "9 de mayo de 2025".
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = normalize_whitespace(raw);

        let parsed = self
            .date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&raw, fmt).ok());
        if parsed.is_some() {
            return parsed;
        }

        if let Some((day, _time)) = raw.split_once('T') {
            if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
                return Some(date);
            }
        }

        parse_spanish_date(&raw)
    }
}

fn parse_spanish_date(raw: &str) -> Option<NaiveDate> {
    let folded = fold_label(raw);
    let caps = SPANISH_DATE.captures(&folded)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = MONTHS
        .iter()
        .find(|(name, _)| *name == &caps[2])
        .map(|(_, number)| *number)?;
    let year: i32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn optional(draft: &DraftRecord, field: DraftField) -> Option<String> {
    draft
        .get(field)
        .map(normalize_whitespace)
        .filter(|v| !v.is_empty())
}

fn required(draft: &DraftRecord, field: DraftField) -> Result<String, Rejection> {
    optional(draft, field).ok_or(Rejection::MissingField(field.name()))
}
