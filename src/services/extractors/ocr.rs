//! Optical character recognition backends.
//!
//! The default backend shells out to the Tesseract CLI (`tsv` output, so
//! word confidences are available) and rasterizes scanned PDFs with
//! Poppler's `pdftoppm` first. Child processes are killed when the future
//! is dropped, so timeouts and cancellation do not leak them.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::ExtractionConfig;

/// What kind of document is handed to the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrInput {
    Image,
    /// PDF without a text layer; pages are rasterized first
    ScannedPdf,
}

/// Recognized text with its mean word confidence (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Capability to turn image bytes into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, content: &[u8], input: OcrInput) -> Result<OcrText>;
}

/// Tesseract CLI backend.
pub struct TesseractOcr {
    command: String,
    language: String,
    rasterizer: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            rasterizer: "pdftoppm".into(),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.ocr_command, &config.ocr_language)
    }

    async fn recognize_image(&self, image: &[u8]) -> Result<OcrText> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", self.language.as_str(), "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::parse("ocr", format!("cannot run {}: {e}", self.command)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::parse("ocr", "stdin not captured"))?;
        let image = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&image).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await.map_err(scratch_error)?;
        // Tesseract may close stdin early on unreadable input; exit status tells
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::parse(
                "ocr",
                format!("{} exited with {}: {}", self.command, output.status, stderr.trim()),
            ));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn recognize_pdf(&self, pdf: &[u8]) -> Result<OcrText> {
        let dir = tempfile::tempdir().map_err(scratch_error)?;
        let input = dir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await.map_err(scratch_error)?;

        let status = Command::new(&self.rasterizer)
            .args(["-r", "300", "-png"])
            .arg(&input)
            .arg(dir.path().join("page"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| AppError::parse("ocr", format!("cannot run {}: {e}", self.rasterizer)))?;
        if !status.success() {
            return Err(AppError::parse(
                "ocr",
                format!("{} exited with {status}", self.rasterizer),
            ));
        }

        let pages = rendered_pages(dir.path()).await?;
        if pages.is_empty() {
            return Err(AppError::parse("ocr", "PDF rendered no pages"));
        }

        let mut page_texts = Vec::with_capacity(pages.len());
        for page in pages {
            let bytes = tokio::fs::read(&page).await.map_err(scratch_error)?;
            page_texts.push(self.recognize_image(&bytes).await?);
        }
        Ok(merge_pages(page_texts))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, content: &[u8], input: OcrInput) -> Result<OcrText> {
        match input {
            OcrInput::Image => self.recognize_image(content).await,
            OcrInput::ScannedPdf => self.recognize_pdf(content).await,
        }
    }
}

/// PNG pages written by the rasterizer, in page order.
async fn rendered_pages(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(scratch_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(scratch_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            pages.push(path);
        }
    }
    // pdftoppm zero-pads page numbers, so lexical order is page order
    pages.sort();
    Ok(pages)
}

/// Local I/O around the OCR tools fails the extraction, not the fetch.
fn scratch_error(err: std::io::Error) -> AppError {
    AppError::parse("ocr", format!("scratch I/O failed: {err}"))
}

fn merge_pages(pages: Vec<OcrText>) -> OcrText {
    let confidences: Vec<f32> = pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = (!confidences.is_empty())
        .then(|| confidences.iter().sum::<f32>() / confidences.len() as f32);
    let text = pages
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("\n\n");
    OcrText { text, confidence }
}

/// Recognized word with its horizontal extent in pixels.
struct Word {
    left: i64,
    width: i64,
    text: String,
}

impl Word {
    fn right(&self) -> i64 {
        self.left + self.width
    }

    fn char_width(&self) -> f32 {
        self.width as f32 / self.text.chars().count().max(1) as f32
    }
}

/// Join the words of one line, keeping column gaps visible.
///
/// A gap wider than two characters of the preceding word becomes a double
/// space, which segmentation reads as a cell boundary.
fn join_line(words: &[Word]) -> String {
    let mut line = String::new();
    for (idx, word) in words.iter().enumerate() {
        if idx > 0 {
            let prev = &words[idx - 1];
            let gap = (word.left - prev.right()) as f32;
            line.push_str(if gap > 2.0 * prev.char_width() { "  " } else { " " });
        }
        line.push_str(&word.text);
    }
    line
}

/// Rebuild text from Tesseract TSV output.
///
/// Words on the same line are joined with spaces (two across a column gap),
/// lines with newlines and paragraphs with a blank line so segmentation sees
/// the same structure it gets from PDF text.
pub fn parse_tsv(tsv: &str) -> OcrText {
    // (page, block, paragraph) -> line -> words
    let mut paragraphs: BTreeMap<(u32, u32, u32), BTreeMap<u32, Vec<Word>>> = BTreeMap::new();
    let mut confidence_sum = 0.0f32;
    let mut word_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        let Ok(conf) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        if word.is_empty() || conf < 0.0 {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let px = |i: usize| cols[i].trim().parse::<i64>().unwrap_or(0);
        paragraphs
            .entry((num(1), num(2), num(3)))
            .or_default()
            .entry(num(4))
            .or_default()
            .push(Word {
                left: px(6),
                width: px(8),
                text: word.to_string(),
            });

        confidence_sum += conf;
        word_count += 1;
    }

    let text = paragraphs
        .values()
        .map(|lines| {
            lines
                .values()
                .map(|words| join_line(words))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    OcrText {
        text,
        confidence: (word_count > 0).then(|| confidence_sum / word_count as f32),
    }
}
