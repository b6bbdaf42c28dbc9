//! OCR-based extraction for scanned publications.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Extractor, OcrEngine, OcrInput, segment};
use crate::error::{AppError, Result};
use crate::models::{DraftRecord, DraftWarning, SourceFormat};
use crate::services::RawSource;
use crate::services::detector::is_pdf_magic;

/// Runs OCR over an image (or a scanned PDF) and segments the text.
pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
    /// Mean confidence (0-100) under which drafts are flagged
    threshold: f32,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, threshold: f32) -> Self {
        Self { ocr, threshold }
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Image
    }

    async fn extract(&self, source: &RawSource) -> Result<Vec<DraftRecord>> {
        let input = if is_pdf_magic(&source.bytes) {
            OcrInput::ScannedPdf
        } else {
            OcrInput::Image
        };

        let ocr = self.ocr.recognize(&source.bytes, input).await?;
        if ocr.text.trim().is_empty() {
            return Err(AppError::parse(&source.url, "OCR produced no text"));
        }

        let mut drafts = segment(&ocr.text, SourceFormat::Image, &source.url);

        // No confidence reported counts as unknown, not as low
        if let Some(confidence) = ocr.confidence.filter(|c| *c < self.threshold) {
            log::warn!(
                "Low OCR confidence for {}: {:.1} < {:.1}, {} records flagged for review",
                source.url,
                confidence,
                self.threshold,
                drafts.len()
            );
            for draft in &mut drafts {
                draft.warnings.push(DraftWarning::LowConfidenceExtraction {
                    confidence,
                    threshold: self.threshold,
                });
            }
        }

        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::DraftField;
    use crate::services::extractors::OcrText;

    struct RecordingOcr {
        output: OcrText,
        seen: Mutex<Vec<OcrInput>>,
    }

    impl RecordingOcr {
        fn new(text: &str, confidence: Option<f32>) -> Arc<Self> {
            Arc::new(Self {
                output: OcrText {
                    text: text.to_string(),
                    confidence,
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for RecordingOcr {
        async fn recognize(&self, _content: &[u8], input: OcrInput) -> Result<OcrText> {
            self.seen.lock().unwrap().push(input);
            Ok(self.output.clone())
        }
    }

    const TEXT: &str = "Expediente: 2023-00123\nFecha: 08/05/2025\nActuación: Traslado\n\
                        Descripción: Se corre traslado de excepciones";

    #[tokio::test]
    async fn test_confident_ocr_has_no_warning() {
        let ocr = RecordingOcr::new(TEXT, Some(91.0));
        let extractor = ImageExtractor::new(ocr.clone(), 60.0);
        let source = RawSource::new("https://example.com/j5/estado.png", b"\x89PNG".to_vec());

        let drafts = extractor.extract(&source).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get(DraftField::StatusType), Some("Traslado"));
        assert_eq!(drafts[0].source_format, SourceFormat::Image);
        assert!(drafts[0].warnings.is_empty());
        assert_eq!(*ocr.seen.lock().unwrap(), vec![OcrInput::Image]);
    }

    #[tokio::test]
    async fn test_low_confidence_flags_drafts() {
        let extractor = ImageExtractor::new(RecordingOcr::new(TEXT, Some(42.0)), 60.0);
        let source = RawSource::new("https://example.com/j5/estado.jpg", b"\xFF\xD8\xFF".to_vec());

        let drafts = extractor.extract(&source).await.unwrap();
        assert_eq!(
            drafts[0].warnings,
            vec![DraftWarning::LowConfidenceExtraction {
                confidence: 42.0,
                threshold: 60.0
            }]
        );
    }

    #[tokio::test]
    async fn test_pdf_bytes_are_rasterized() {
        let ocr = RecordingOcr::new(TEXT, None);
        let extractor = ImageExtractor::new(ocr.clone(), 60.0);
        let source = RawSource::new("https://example.com/scan.pdf", b"%PDF-1.4".to_vec());

        extractor.extract(&source).await.unwrap();
        assert_eq!(*ocr.seen.lock().unwrap(), vec![OcrInput::ScannedPdf]);
    }

    #[tokio::test]
    async fn test_empty_ocr_is_parse_error() {
        let extractor = ImageExtractor::new(RecordingOcr::new("  \n", Some(10.0)), 60.0);
        let source = RawSource::new("https://example.com/blank.png", b"\x89PNG".to_vec());

        let err = extractor.extract(&source).await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }
}
