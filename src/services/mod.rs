//! Service layer for the ingestion pipeline.
//!
//! This module contains the per-source building blocks:
//! - Source fetching (`SourceFetcher`, `DefaultFetcher`)
//! - Format detection (`FormatDetector`)
//! - Format-specific extraction (`Extractor`, `ExtractorRegistry`)
//! - Draft validation (`Normalizer`)

pub mod detector;
pub mod extractors;
pub mod fetcher;
pub mod normalizer;

pub use detector::FormatDetector;
pub use extractors::{Extractor, ExtractorRegistry};
pub use fetcher::{DefaultFetcher, RawSource, SourceFetcher};
pub use normalizer::Normalizer;
