// src/models/court.rs

//! Court definitions and the sources they publish to.

use serde::{Deserialize, Serialize};

/// A municipal civil court and the URLs where it publishes its statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    /// Court number
    pub id: u32,

    /// Display name (e.g., "Juzgado 3° Civil Municipal de Pereira")
    pub name: String,

    /// Publication URLs (HTML pages, PDF documents or images)
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Court {
    /// Court with the conventional name for its number.
    pub fn numbered(id: u32) -> Self {
        Self {
            id,
            name: default_court_name(id),
            sources: Vec::new(),
        }
    }

    /// All (court, url) pairs this court contributes to an aggregation.
    pub fn source_refs(&self) -> impl Iterator<Item = CourtSource> + '_ {
        self.sources.iter().map(move |url| CourtSource {
            court_id: self.id,
            url: url.clone(),
        })
    }
}

/// Name used when a court has no configured display name.
pub fn default_court_name(id: u32) -> String {
    format!("Juzgado {id}° Civil Municipal")
}

/// One unit of ingestion work.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtSource {
    pub court_id: u32,
    pub url: String,
}

impl CourtSource {
    pub fn new(court_id: u32, url: impl Into<String>) -> Self {
        Self {
            court_id,
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_refs() {
        let court = Court {
            id: 2,
            name: "Juzgado 2° Civil Municipal de Pereira".into(),
            sources: vec!["https://a/estados.html".into(), "https://a/estados.pdf".into()],
        };
        let refs: Vec<_> = court.source_refs().collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1], CourtSource::new(2, "https://a/estados.pdf"));
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(Court::numbered(7).name, "Juzgado 7° Civil Municipal");
    }
}
