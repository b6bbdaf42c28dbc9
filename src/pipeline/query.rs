// src/pipeline/query.rs

//! Filtering over an aggregated record set.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::CourtStatus;
use crate::utils::text::fold_label;

/// Field the free-text search looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchField {
    CaseNumber,
    #[default]
    Description,
}

impl FromStr for SearchField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "expediente" | "case" | "casenumber" | "case-number" => Ok(Self::CaseNumber),
            "descripcion" | "description" => Ok(Self::Description),
            _ => Err(AppError::validation(format!("unknown search field '{s}'"))),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaseNumber => f.write_str("caseNumber"),
            Self::Description => f.write_str("description"),
        }
    }
}

/// Filter specification; every unset part matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub court_id: Option<u32>,
    pub search_term: Option<String>,
    #[serde(default)]
    pub search_field: SearchField,
    /// Earliest date kept, inclusive
    pub since: Option<NaiveDate>,
}

impl QueryFilter {
    pub fn is_empty(&self) -> bool {
        self.court_id.is_none() && self.term().is_none() && self.since.is_none()
    }

    /// Lowercased search term, if it has any content.
    fn term(&self) -> Option<String> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, record: &CourtStatus) -> bool {
        self.matches_term(record, self.term().as_deref())
    }

    fn matches_term(&self, record: &CourtStatus, term: Option<&str>) -> bool {
        if self.court_id.is_some_and(|id| id != record.court_id) {
            return false;
        }
        if self.since.is_some_and(|since| record.date < since) {
            return false;
        }
        match term {
            None => true,
            Some(term) => {
                let haystack = match self.search_field {
                    SearchField::CaseNumber => &record.case_number,
                    SearchField::Description => &record.description,
                };
                haystack.to_lowercase().contains(term)
            }
        }
    }
}

/// Records matching `filter`, in their incoming order.
pub fn query(records: &[CourtStatus], filter: &QueryFilter) -> Vec<CourtStatus> {
    let term = filter.term();
    records
        .iter()
        .filter(|r| filter.matches_term(r, term.as_deref()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceFormat;

    fn record(court_id: u32, case_number: &str, day: u32, description: &str) -> CourtStatus {
        CourtStatus {
            id: format!("{court_id}-{case_number}"),
            court_id,
            case_number: case_number.into(),
            date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            case_type: "Verbal".into(),
            status_type: "Auto".into(),
            description: description.into(),
            source_format: SourceFormat::Html,
            source_url: "https://example.com".into(),
            warnings: Vec::new(),
        }
    }

    fn records() -> Vec<CourtStatus> {
        vec![
            record(2, "2301-4521", 9, "Se ADMITE demanda"),
            record(1, "2301-0001", 9, "Traslado de excepciones"),
            record(2, "2299-0100", 8, "Se admite recurso"),
            record(3, "2301-4599", 6, "Sentencia"),
        ]
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let records = records();
        let filter = QueryFilter::default();
        assert!(filter.is_empty());
        assert_eq!(query(&records, &filter), records);

        let blank = QueryFilter {
            search_term: Some("   ".into()),
            ..QueryFilter::default()
        };
        assert!(blank.is_empty());
        assert_eq!(query(&records, &blank), records);
    }

    #[test]
    fn test_description_search_is_case_insensitive() {
        let filter = QueryFilter {
            search_term: Some("admite".into()),
            ..QueryFilter::default()
        };
        let ids: Vec<String> = query(&records(), &filter).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["2-2301-4521", "2-2299-0100"]);
    }

    #[test]
    fn test_case_number_search_with_court() {
        let filter = QueryFilter {
            court_id: Some(2),
            search_term: Some("2301".into()),
            search_field: SearchField::CaseNumber,
            since: None,
        };
        let result = query(&records(), &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].case_number, "2301-4521");
    }

    #[test]
    fn test_since_is_inclusive() {
        let filter = QueryFilter {
            since: NaiveDate::from_ymd_opt(2025, 5, 8),
            ..QueryFilter::default()
        };
        assert_eq!(query(&records(), &filter).len(), 3);
    }

    #[test]
    fn test_query_is_idempotent() {
        let records = records();
        for filter in [
            QueryFilter {
                court_id: Some(2),
                ..QueryFilter::default()
            },
            QueryFilter {
                search_term: Some("SE".into()),
                ..QueryFilter::default()
            },
            QueryFilter {
                court_id: Some(1),
                search_term: Some("2301".into()),
                search_field: SearchField::CaseNumber,
                since: NaiveDate::from_ymd_opt(2025, 5, 1),
            },
        ] {
            let once = query(&records, &filter);
            assert_eq!(query(&once, &filter), once);
        }
    }

    #[test]
    fn test_search_field_from_str() {
        assert_eq!("expediente".parse::<SearchField>().unwrap(), SearchField::CaseNumber);
        assert_eq!("caseNumber".parse::<SearchField>().unwrap(), SearchField::CaseNumber);
        assert_eq!("Descripción".parse::<SearchField>().unwrap(), SearchField::Description);
        assert!("fecha".parse::<SearchField>().is_err());
    }
}
