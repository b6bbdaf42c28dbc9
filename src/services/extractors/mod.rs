//! Format-specific extraction strategies.
//!
//! Each strategy turns raw source content into draft records:
//! - `HtmlExtractor`: table or block layouts located by CSS anchors
//! - `PdfExtractor`: embedded text layer, segmented into entries
//! - `ImageExtractor`: OCR text, segmented the same way
//!
//! `ExtractorRegistry` picks one by detected format and owns the
//! scanned-PDF fallback policy.

mod html;
mod image;
mod ocr;
mod pdf;
mod segment;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{DraftRecord, DraftWarning, ExtractionConfig, SourceFormat};
use crate::services::RawSource;

pub use html::HtmlExtractor;
pub use image::ImageExtractor;
pub use ocr::{OcrEngine, OcrInput, OcrText, TesseractOcr, parse_tsv};
pub use pdf::PdfExtractor;
pub use segment::segment;

#[cfg(test)]
pub(crate) use pdf::fixtures;

/// Capability to turn raw content of one format into draft records.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Format this strategy handles.
    fn format(&self) -> SourceFormat;

    async fn extract(&self, source: &RawSource) -> Result<Vec<DraftRecord>>;
}

/// Extractors keyed by the format they handle.
pub struct ExtractorRegistry {
    extractors: HashMap<SourceFormat, Arc<dyn Extractor>>,
    pdf_ocr_fallback: bool,
}

impl ExtractorRegistry {
    /// Empty registry.
    pub fn new(pdf_ocr_fallback: bool) -> Self {
        Self {
            extractors: HashMap::new(),
            pdf_ocr_fallback,
        }
    }

    /// Registry with the three built-in strategies and Tesseract OCR.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        Self::with_ocr(config, Arc::new(TesseractOcr::from_config(config)))
    }

    /// Registry with the built-in strategies and a caller-supplied OCR engine.
    pub fn with_ocr(config: &ExtractionConfig, ocr: Arc<dyn OcrEngine>) -> Result<Self> {
        let mut registry = Self::new(config.pdf_ocr_fallback);
        registry
            .register(Arc::new(HtmlExtractor::new(&config.html_layouts)?))
            .register(Arc::new(PdfExtractor::new()))
            .register(Arc::new(ImageExtractor::new(
                ocr,
                config.ocr_confidence_threshold,
            )));
        Ok(registry)
    }

    /// Add or replace the strategy for the extractor's format.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) -> &mut Self {
        self.extractors.insert(extractor.format(), extractor);
        self
    }

    pub fn get(&self, format: SourceFormat) -> Option<&Arc<dyn Extractor>> {
        self.extractors.get(&format)
    }

    /// Run the strategy for `format`.
    ///
    /// With the fallback enabled, a PDF without a text layer is handed to
    /// the image strategy and its drafts are tagged `PdfOcrFallback`.
    pub async fn extract(&self, format: SourceFormat, source: &RawSource) -> Result<Vec<DraftRecord>> {
        let extractor = self
            .get(format)
            .ok_or_else(|| AppError::config(format!("No extractor registered for {format}")))?;

        match extractor.extract(source).await {
            Err(AppError::NoTextLayer { url }) if format == SourceFormat::Pdf => {
                let fallback = self
                    .get(SourceFormat::Image)
                    .filter(|_| self.pdf_ocr_fallback);
                let Some(ocr) = fallback else {
                    return Err(AppError::NoTextLayer { url });
                };

                log::info!("No text layer in {}, falling back to OCR", url);
                let mut drafts = ocr.extract(source).await?;
                for draft in &mut drafts {
                    draft.warnings.push(DraftWarning::PdfOcrFallback);
                }
                Ok(drafts)
            }
            other => other,
        }
    }
}
