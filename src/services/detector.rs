//! Publication format detection.
//!
//! Classifies a fetched source as HTML, PDF or image. Signals are tried in
//! order: transport content type, then file extension, then magic bytes.

use crate::error::{AppError, Result};
use crate::models::SourceFormat;
use crate::services::RawSource;
use crate::utils::url::path_extension;

/// Stateless classifier for fetched sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify a source, failing with `UnknownFormat` when no signal matches.
    pub fn detect(&self, source: &RawSource) -> Result<SourceFormat> {
        let format = source
            .content_type
            .as_deref()
            .and_then(Self::from_content_type)
            .or_else(|| path_extension(&source.url).and_then(|ext| Self::from_extension(&ext)))
            .or_else(|| Self::sniff(&source.bytes));

        match format {
            Some(format) => {
                log::debug!("Detected {} for {}", format, source.url);
                Ok(format)
            }
            None => Err(AppError::UnknownFormat {
                url: source.url.clone(),
            }),
        }
    }

    /// Map a media type. Generic types like `application/octet-stream` are inconclusive.
    pub fn from_content_type(content_type: &str) -> Option<SourceFormat> {
        let media = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media.as_str() {
            "text/html" | "application/xhtml+xml" => Some(SourceFormat::Html),
            "application/pdf" | "application/x-pdf" => Some(SourceFormat::Pdf),
            m if m.starts_with("image/") => Some(SourceFormat::Image),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<SourceFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" | "xhtml" | "php" | "asp" | "aspx" | "jsp" => Some(SourceFormat::Html),
            "pdf" => Some(SourceFormat::Pdf),
            "png" | "jpg" | "jpeg" | "gif" | "tif" | "tiff" | "bmp" | "webp" => {
                Some(SourceFormat::Image)
            }
            _ => None,
        }
    }

    /// Classify by leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<SourceFormat> {
        if is_pdf_magic(bytes) {
            return Some(SourceFormat::Pdf);
        }
        if is_image_magic(bytes) {
            return Some(SourceFormat::Image);
        }
        if looks_like_html(bytes) {
            return Some(SourceFormat::Html);
        }
        None
    }
}

/// Strip a UTF-8 BOM and leading ASCII whitespace.
fn skip_preamble(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// PDF magic: `%PDF` after optional BOM/whitespace.
pub fn is_pdf_magic(bytes: &[u8]) -> bool {
    skip_preamble(bytes).starts_with(b"%PDF")
}

fn is_image_magic(bytes: &[u8]) -> bool {
    const SIGNATURES: &[&[u8]] = &[
        b"\x89PNG\r\n\x1a\n",
        b"\xFF\xD8\xFF",
        b"GIF87a",
        b"GIF89a",
        b"II*\x00",
        b"MM\x00*",
    ];

    if SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return true;
    }
    is_bmp(bytes) || (bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP")
}

/// `BM` file header whose declared size matches the body, with zeroed
/// reserved bytes and the pixel data inside the file.
fn is_bmp(bytes: &[u8]) -> bool {
    let Some(header) = bytes.get(..14) else {
        return false;
    };
    let le = |range: std::ops::Range<usize>| {
        header[range]
            .iter()
            .rev()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize)
    };

    header.starts_with(b"BM")
        && le(2..6) == bytes.len()
        && le(6..10) == 0
        && (14..bytes.len()).contains(&le(10..14))
}

fn looks_like_html(bytes: &[u8]) -> bool {
    const MARKERS: &[&[u8]] = &[b"<!doctype html", b"<html", b"<head", b"<body", b"<table"];

    let head = skip_preamble(bytes);
    let head = &head[..head.len().min(64)];
    let lower = head.to_ascii_lowercase();
    MARKERS.iter().any(|m| lower.starts_with(m))
}
