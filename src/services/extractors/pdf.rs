//! PDF text-layer extraction using the pdf-extract crate.

use async_trait::async_trait;

use super::{Extractor, segment};
use crate::error::{AppError, Result};
use crate::models::{DraftRecord, SourceFormat};
use crate::services::RawSource;

/// Extracts drafts from the embedded text of digital PDFs.
///
/// Scanned PDFs fail with `NoTextLayer`; whether they are retried through
/// OCR is the registry's decision.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Text layer of a PDF, run off the async workers.
    async fn text_layer(source: &RawSource) -> Result<String> {
        let bytes = source.bytes.clone();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AppError::parse(&source.url, format!("PDF extraction aborted: {e}")))?
            .map_err(|e| AppError::parse(&source.url, format!("unreadable PDF: {e}")))
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Pdf
    }

    async fn extract(&self, source: &RawSource) -> Result<Vec<DraftRecord>> {
        let text = Self::text_layer(source).await?;
        if text.trim().is_empty() {
            return Err(AppError::NoTextLayer {
                url: source.url.clone(),
            });
        }

        let drafts = segment(&text, SourceFormat::Pdf, &source.url);
        if drafts.is_empty() {
            log::warn!(
                "PDF {} has text but no recognisable status entries",
                source.url
            );
        }
        Ok(drafts)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::make_pdf;
    use super::*;
    use crate::models::DraftField;

    #[tokio::test]
    async fn test_extracts_labelled_entries() {
        let pdf = make_pdf(&[
            "Expediente: 2301-4521",
            "Fecha: 09/05/2025",
            "Actuacion: Auto",
            "Descripcion: Se admite demanda",
        ]);
        let source = RawSource::new("https://example.com/j3/estados.pdf", pdf);

        let drafts = PdfExtractor::new().extract(&source).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(
            drafts[0]
                .get(DraftField::CaseNumber)
                .is_some_and(|c| c.contains("2301-4521"))
        );
        assert_eq!(drafts[0].source_format, SourceFormat::Pdf);
        assert_eq!(drafts[0].source_url, "https://example.com/j3/estados.pdf");
    }

    #[tokio::test]
    async fn test_blank_pdf_has_no_text_layer() {
        let source = RawSource::new("https://example.com/scan.pdf", make_pdf(&[]));
        let err = PdfExtractor::new().extract(&source).await.unwrap_err();
        assert!(matches!(err, AppError::NoTextLayer { .. }));
    }

    #[tokio::test]
    async fn test_garbage_is_parse_error() {
        let source = RawSource::new("https://example.com/x.pdf", b"not a pdf".to_vec());
        let err = PdfExtractor::new().extract(&source).await.unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }
}
