//! HTML status listings.
//!
//! Court pages publish either a table (one row per status) or repeated
//! blocks of `Label: value` text. Layouts are tried in configured order and
//! the first one whose anchor is present wins.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::segment::header_mapping;
use super::{Extractor, segment};
use crate::error::{AppError, Result};
use crate::models::{DraftField, DraftRecord, HtmlLayout, SourceFormat};
use crate::services::RawSource;
use crate::utils::text::normalize_whitespace;

/// Column mapping: the field each cell position feeds, if any.
type Columns = Vec<Option<DraftField>>;

enum Anchor {
    Table {
        selector: Selector,
        /// Fixed mapping for tables published without a header row
        columns: Option<Columns>,
    },
    Blocks {
        selector: Selector,
    },
}

/// Scrapes status tables or blocks with CSS anchors.
pub struct HtmlExtractor {
    anchors: Vec<Anchor>,
}

impl HtmlExtractor {
    /// Compile the configured layouts.
    pub fn new(layouts: &[HtmlLayout]) -> Result<Self> {
        let anchors = layouts
            .iter()
            .map(|layout| match layout {
                HtmlLayout::Table {
                    table_selector,
                    columns,
                } => Ok(Anchor::Table {
                    selector: parse_selector(table_selector)?,
                    columns: explicit_columns(columns)?,
                }),
                HtmlLayout::Blocks { block_selector } => Ok(Anchor::Blocks {
                    selector: parse_selector(block_selector)?,
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { anchors })
    }

    /// Parse a page and read it with the first matching layout.
    ///
    /// `Html` is not `Send`, so this stays synchronous.
    fn extract_document(&self, html: &str, url: &str) -> Result<Vec<DraftRecord>> {
        let document = Html::parse_document(html);

        for anchor in &self.anchors {
            let found = match anchor {
                Anchor::Table { selector, columns } => {
                    read_tables(&document, selector, columns.as_ref(), url)
                }
                Anchor::Blocks { selector } => read_blocks(&document, selector, url),
            };

            if let Some(mut drafts) = found {
                for (sequence, draft) in drafts.iter_mut().enumerate() {
                    draft.sequence = sequence;
                }
                return Ok(drafts);
            }
        }

        Err(AppError::parse(
            url,
            "no known status table or block layout found",
        ))
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Html
    }

    async fn extract(&self, source: &RawSource) -> Result<Vec<DraftRecord>> {
        let html = source.text();
        let drafts = self.extract_document(&html, &source.url)?;
        log::debug!("{} HTML entries in {}", drafts.len(), source.url);
        Ok(drafts)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn explicit_columns(labels: &[String]) -> Result<Option<Columns>> {
    if labels.is_empty() {
        return Ok(None);
    }
    let columns: Columns = labels.iter().map(|l| DraftField::from_label(l)).collect();
    if !columns.contains(&Some(DraftField::CaseNumber)) {
        return Err(AppError::config(format!(
            "table columns {labels:?} name no case-number column"
        )));
    }
    Ok(Some(columns))
}

/// Drafts from every selected table that has a usable column mapping.
/// `None` when no table qualifies.
fn read_tables(
    document: &Html,
    selector: &Selector,
    columns: Option<&Columns>,
    url: &str,
) -> Option<Vec<DraftRecord>> {
    let mut matched = false;
    let mut drafts = Vec::new();

    for table in document.select(selector) {
        let mut mapping = columns.cloned();

        for row in table_rows(table) {
            let cells = row_cells(row);
            if cells.iter().all(String::is_empty) {
                continue;
            }

            let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
            if let Some(header) = header_mapping(&refs) {
                // Repeated header rows are skipped once a fixed mapping is set
                if columns.is_none() {
                    mapping = Some(header);
                }
                continue;
            }

            let Some(mapping) = &mapping else {
                continue;
            };
            let mut draft = DraftRecord::new(SourceFormat::Html, url, drafts.len());
            for (cell, field) in cells.iter().zip(mapping) {
                if let Some(field) = field {
                    draft.push(*field, cell);
                }
            }
            if !draft.is_empty() {
                drafts.push(draft);
            }
        }

        matched |= mapping.is_some();
    }

    matched.then_some(drafts)
}

/// Rows that belong to this table, not to tables nested inside it.
fn table_rows(table: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .flat_map(|child| match child.value().name() {
            "tr" => vec![child],
            "thead" | "tbody" | "tfoot" => child
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|row| row.value().name() == "tr")
                .collect(),
            _ => Vec::new(),
        })
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| normalize_whitespace(&cell.text().collect::<String>()))
        .collect()
}

/// Drafts from each selected block, read as text. `None` when nothing is selected.
fn read_blocks(document: &Html, selector: &Selector, url: &str) -> Option<Vec<DraftRecord>> {
    let mut matched = false;
    let mut drafts = Vec::new();

    for block in document.select(selector) {
        matched = true;
        let text = block
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        drafts.extend(segment(&text, SourceFormat::Html, url));
    }

    matched.then_some(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionConfig;

    const URL: &str = "https://example.com/juzgado3/estados.html";

    fn extractor() -> HtmlExtractor {
        HtmlExtractor::new(&ExtractionConfig::default().html_layouts).unwrap()
    }

    #[test]
    fn test_table_with_header() {
        let html = r#"
            <html><body>
              <table class="layout"><tr><td>
                <table>
                  <thead><tr><th>Radicado</th><th>Fecha</th><th>Clase de proceso</th>
                    <th>Actuación</th><th>Anotación</th><th>Folios</th></tr></thead>
                  <tbody>
                    <tr><td>2301-4521</td><td>09/05/2025</td><td>Verbal</td>
                      <td>Auto</td><td>Se admite   demanda</td><td>3</td></tr>
                    <tr><td> </td><td></td><td></td><td></td><td></td><td></td></tr>
                    <tr><td>2301-4522</td><td>08/05/2025</td><td>Ejecutivo</td>
                      <td>Sentencia</td><td>Se ordena seguir adelante</td><td>7</td></tr>
                  </tbody>
                </table>
              </td></tr></table>
            </body></html>
        "#;

        let drafts = extractor().extract_document(html, URL).unwrap();
        assert_eq!(drafts.len(), 2);

        let first = &drafts[0];
        assert_eq!(first.sequence, 0);
        assert_eq!(first.get(DraftField::CaseNumber), Some("2301-4521"));
        assert_eq!(first.get(DraftField::Date), Some("09/05/2025"));
        assert_eq!(first.get(DraftField::CaseType), Some("Verbal"));
        assert_eq!(first.get(DraftField::StatusType), Some("Auto"));
        assert_eq!(first.get(DraftField::Description), Some("Se admite demanda"));
        assert_eq!(first.source_format, SourceFormat::Html);
        assert_eq!(drafts[1].sequence, 1);
    }

    #[test]
    fn test_explicit_columns_without_header() {
        let layouts = vec![HtmlLayout::Table {
            table_selector: "table#estados".into(),
            columns: vec!["Expediente".into(), "Fecha".into(), "Descripción".into()],
        }];
        let html = r#"<table id="estados">
            <tr><td>2023-00123</td><td>2025-05-09</td><td>Traslado de excepciones</td></tr>
        </table>"#;

        let drafts = HtmlExtractor::new(&layouts)
            .unwrap()
            .extract_document(html, URL)
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(
            drafts[0].get(DraftField::Description),
            Some("Traslado de excepciones")
        );
    }

    #[test]
    fn test_explicit_columns_need_case_number() {
        let layouts = vec![HtmlLayout::Table {
            table_selector: "table".into(),
            columns: vec!["Fecha".into(), "Descripción".into()],
        }];
        assert!(matches!(
            HtmlExtractor::new(&layouts),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_blocks_layout() {
        let html = r#"
            <div class="estado">
              <p><strong>Expediente:</strong> 2301-4521</p>
              <p><strong>Fecha:</strong> 9 de mayo de 2025</p>
              <p><strong>Descripción:</strong> Se admite demanda</p>
            </div>
            <div class="estado">
              <p><strong>Expediente:</strong> 2301-4522</p>
              <p><strong>Fecha:</strong> 2025-05-08</p>
              <p><strong>Descripción:</strong> Se fija fecha de audiencia</p>
            </div>
        "#;

        let drafts = extractor().extract_document(html, URL).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].get(DraftField::CaseNumber), Some("2301-4521"));
        assert_eq!(drafts[0].get(DraftField::Date), Some("9 de mayo de 2025"));
        assert_eq!(drafts[1].sequence, 1);
        assert_eq!(
            drafts[1].get(DraftField::Description),
            Some("Se fija fecha de audiencia")
        );
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        let html = "<table><tr><th>Expediente</th><th>Fecha</th></tr></table>";
        let drafts = extractor().extract_document(html, URL).unwrap();
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_missing_anchor_is_parse_error() {
        let html = "<html><body><p>Sitio en mantenimiento</p></body></html>";
        let err = extractor().extract_document(html, URL).unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_invalid_selector() {
        let layouts = vec![HtmlLayout::Blocks {
            block_selector: "[[invalid".into(),
        }];
        assert!(matches!(
            HtmlExtractor::new(&layouts),
            Err(AppError::Selector { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_from_raw_source() {
        let source = RawSource::new(
            URL,
            "<table><tr><th>Expediente</th><th>Fecha</th><th>Descripción</th></tr>\
             <tr><td>2301-4521</td><td>09/05/2025</td><td>Auto admisorio</td></tr></table>",
        );
        let drafts = extractor().extract(&source).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].source_url, URL);
    }
}
