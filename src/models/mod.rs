// src/models/mod.rs

//! Domain models for the court status pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod court;
mod draft;
mod outcome;
mod status;

// Re-export all public types
pub use config::{Config, ExportConfig, ExtractionConfig, FetchConfig, HtmlLayout, NormalizeConfig};
pub use court::{Court, CourtSource, default_court_name};
pub use draft::{DraftField, DraftRecord, DraftWarning};
pub use outcome::{AggregateOutcome, SourceFailure};
pub use status::{CourtStatus, SourceFormat};
