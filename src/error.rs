// src/error.rs

//! Unified error handling for the ingestion pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Source could not be classified as HTML, PDF or image
    #[error("Unknown format for {url}")]
    UnknownFormat { url: String },

    /// Extractor could not find the structure or text it expects
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// PDF carries no extractable text (scanned document)
    #[error("No text layer in {url}")]
    NoTextLayer { url: String },

    /// Source fetch returned a non-success status or was unreachable
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Per-source budget exceeded
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Aggregation was cancelled by the caller
    #[error("Aggregation cancelled")]
    Cancelled,
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Classify this error for the per-source failure report.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::UnknownFormat { .. } => FailureKind::UnknownFormat,
            Self::Parse { .. } | Self::Selector { .. } | Self::NoTextLayer { .. } => {
                FailureKind::ParseError
            }
            Self::Timeout(_) => FailureKind::TimeoutError,
            Self::Http(e) if e.is_timeout() => FailureKind::TimeoutError,
            _ => FailureKind::FetchError,
        }
    }
}

/// Kind of a per-source failure reported by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    UnknownFormat,
    ParseError,
    TimeoutError,
    FetchError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownFormat => "UnknownFormat",
            Self::ParseError => "ParseError",
            Self::TimeoutError => "TimeoutError",
            Self::FetchError => "FetchError",
        };
        f.write_str(name)
    }
}

/// Reason a draft record was dropped by the normalizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid date: '{0}'")]
    InvalidDate(String),

    #[error("court {0} is not configured")]
    InvalidCourt(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            AppError::UnknownFormat { url: "x".into() }.failure_kind(),
            FailureKind::UnknownFormat
        );
        assert_eq!(
            AppError::parse("table", "no rows").failure_kind(),
            FailureKind::ParseError
        );
        assert_eq!(
            AppError::NoTextLayer { url: "x.pdf".into() }.failure_kind(),
            FailureKind::ParseError
        );
        assert_eq!(
            AppError::Timeout(Duration::from_secs(3)).failure_kind(),
            FailureKind::TimeoutError
        );
        assert_eq!(
            AppError::fetch("http://x", "404").failure_kind(),
            FailureKind::FetchError
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Timed out after 30s");
        let err = AppError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "Timed out after 200ms");
    }
}
