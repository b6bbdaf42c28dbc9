//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Court, CourtSource};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and fetching behavior settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Format-specific extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Field coercion rules
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Export document settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Court definitions
    #[serde(default = "defaults::courts")]
    pub courts: Vec<Court>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.extraction.ocr_confidence_threshold) {
            return Err(AppError::validation(
                "extraction.ocr_confidence_threshold must be within 0..=100",
            ));
        }
        if self.extraction.ocr_command.trim().is_empty() {
            return Err(AppError::validation("extraction.ocr_command is empty"));
        }
        if self.extraction.html_layouts.is_empty() {
            return Err(AppError::validation("No HTML layouts defined"));
        }
        if self.normalize.date_formats.is_empty() {
            return Err(AppError::validation("No date formats defined"));
        }
        if self.courts.is_empty() {
            return Err(AppError::validation("No courts defined"));
        }

        let mut seen = HashSet::new();
        for court in &self.courts {
            if !seen.insert(court.id) {
                return Err(AppError::validation(format!(
                    "Court {} is defined more than once",
                    court.id
                )));
            }
            for url in &court.sources {
                if url.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Court {} has an empty source URL",
                        court.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Identifiers of every configured court.
    pub fn court_ids(&self) -> Vec<u32> {
        self.courts.iter().map(|c| c.id).collect()
    }

    /// Look up a court by identifier.
    pub fn court(&self, id: u32) -> Option<&Court> {
        self.courts.iter().find(|c| c.id == id)
    }

    /// Ordered (court, url) pairs for an aggregation run.
    pub fn sources(&self) -> Vec<CourtSource> {
        self.courts.iter().flat_map(Court::source_refs).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            normalize: NormalizeConfig::default(),
            export: ExportConfig::default(),
            courts: defaults::courts(),
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Budget for a whole source pipeline (fetch, extraction, OCR) in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum sources processed at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay before each source starts, in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: 0,
        }
    }
}

/// Extraction strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Re-route PDFs without a text layer through OCR instead of failing
    #[serde(default = "defaults::pdf_ocr_fallback")]
    pub pdf_ocr_fallback: bool,

    /// Mean OCR word confidence (0-100) below which drafts get a warning
    #[serde(default = "defaults::ocr_confidence_threshold")]
    pub ocr_confidence_threshold: f32,

    /// OCR executable
    #[serde(default = "defaults::ocr_command")]
    pub ocr_command: String,

    /// OCR language pack
    #[serde(default = "defaults::ocr_language")]
    pub ocr_language: String,

    /// Known page layouts, tried in order
    #[serde(default = "defaults::html_layouts")]
    pub html_layouts: Vec<HtmlLayout>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_ocr_fallback: defaults::pdf_ocr_fallback(),
            ocr_confidence_threshold: defaults::ocr_confidence_threshold(),
            ocr_command: defaults::ocr_command(),
            ocr_language: defaults::ocr_language(),
            html_layouts: defaults::html_layouts(),
        }
    }
}

/// A structural anchor the HTML extractor looks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HtmlLayout {
    /// A table whose header row names the columns.
    Table {
        /// CSS selector for candidate tables
        table_selector: String,

        /// Explicit column labels, for tables without a header row
        #[serde(default)]
        columns: Vec<String>,
    },

    /// Repeated blocks of `Label: value` lines.
    Blocks {
        /// CSS selector for each entry
        block_selector: String,
    },
}

/// Field coercion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Accepted chrono date formats, tried in order
    #[serde(default = "defaults::date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_formats: defaults::date_formats(),
        }
    }
}

/// Export document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Document title prefix
    #[serde(default = "defaults::export_title")]
    pub title: String,

    /// Note printed at the bottom of single-case exports
    #[serde(default = "defaults::export_footer")]
    pub footer: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: defaults::export_title(),
            footer: defaults::export_footer(),
        }
    }
}

mod defaults {
    use super::HtmlLayout;
    use crate::models::Court;

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; estados/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Extraction defaults
    pub fn pdf_ocr_fallback() -> bool {
        true
    }
    pub fn ocr_confidence_threshold() -> f32 {
        60.0
    }
    pub fn ocr_command() -> String {
        "tesseract".into()
    }
    pub fn ocr_language() -> String {
        "spa".into()
    }
    pub fn html_layouts() -> Vec<HtmlLayout> {
        vec![
            HtmlLayout::Table {
                table_selector: "table".into(),
                columns: Vec::new(),
            },
            HtmlLayout::Blocks {
                block_selector: ".estado, .estado-pendiente, li.actuacion".into(),
            },
        ]
    }

    // Normalize defaults
    pub fn date_formats() -> Vec<String> {
        vec![
            "%Y-%m-%d".into(),
            "%d/%m/%Y".into(),
            "%d-%m-%Y".into(),
            "%Y/%m/%d".into(),
            "%d.%m.%Y".into(),
        ]
    }

    // Export defaults
    pub fn export_title() -> String {
        "Estados Pendientes - Juzgados Civiles Municipales de Pereira".into()
    }
    pub fn export_footer() -> String {
        "Este documento es generado automáticamente por el sistema de monitoreo de estados judiciales."
            .into()
    }

    // Court defaults
    pub fn courts() -> Vec<Court> {
        (1..=8)
            .map(|id| Court {
                name: format!("Juzgado {id}° Civil Municipal de Pereira"),
                ..Court::numbered(id)
            })
            .collect()
    }
}
