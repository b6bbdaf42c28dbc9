//! Splits extracted plain text into draft records.
//!
//! Shared by the PDF and OCR strategies. The text is cut into blocks at
//! blank lines and each block is read one of three ways:
//!
//! - `Label: value` lines, with unlabelled lines continuing the last field;
//!   an entry stays open across blank lines until one of its labels repeats
//! - column rows (cells separated by tabs or 2+ spaces), positional or
//!   keyed by a header row seen earlier in the document
//! - free text, where the first date and case-number tokens are picked out
//!   and the rest becomes the description; a line opening with a date or
//!   case number the entry already has starts the next entry
//!
//! Blocks that yield neither a case number nor a date are page furniture
//! (court headers, signatures) and are skipped.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DraftField, DraftRecord, SourceFormat};
use crate::utils::text::normalize_whitespace;

static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([\p{L}][\p{L} .º°]{1,39}?)\s*:\s*(.*)$").expect("valid label regex")
});

static CELL_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+|\s{2,}").expect("valid cell regex"));

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{4}-\d{2}-\d{2}|\d{1,2}[/.-]\d{1,2}[/.-]\d{4}|\d{1,2}\s+de\s+\p{L}+\s+del?\s+\d{4})\b",
    )
    .expect("valid date regex")
});

static CASE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,}(?:[-/]\d+)+\b").expect("valid case regex"));

/// Column order assumed for rows when no header row was seen.
const POSITIONAL: [DraftField; 5] = [
    DraftField::CaseNumber,
    DraftField::Date,
    DraftField::CaseType,
    DraftField::StatusType,
    DraftField::Description,
];

/// Segment plain text into drafts, numbered in reading order.
pub fn segment(text: &str, format: SourceFormat, url: &str) -> Vec<DraftRecord> {
    let mut segmenter = Segmenter {
        format,
        url,
        header: None,
        open: None,
        drafts: Vec::new(),
    };

    for block in blocks(text) {
        segmenter.read_block(&block);
    }
    segmenter.close();

    let mut drafts: Vec<DraftRecord> = segmenter
        .drafts
        .into_iter()
        .filter(|d| d.get(DraftField::CaseNumber).is_some() || d.get(DraftField::Date).is_some())
        .collect();

    for (sequence, draft) in drafts.iter_mut().enumerate() {
        draft.sequence = sequence;
    }
    drafts
}

/// Group non-blank lines into blocks separated by blank lines.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

struct Segmenter<'a> {
    format: SourceFormat,
    url: &'a str,
    /// Column mapping from the most recent header row
    header: Option<Vec<Option<DraftField>>>,
    /// Labelled entry still accepting lines, with the field last written
    open: Option<(DraftRecord, Option<DraftField>)>,
    drafts: Vec<DraftRecord>,
}

impl Segmenter<'_> {
    fn new_draft(&self) -> DraftRecord {
        DraftRecord::new(self.format, self.url, self.drafts.len())
    }

    fn read_block(&mut self, lines: &[&str]) {
        if lines.iter().any(|line| label_of(line).is_some()) {
            self.read_labelled(lines);
        } else {
            self.close();
            self.read_rows(lines);
        }
    }

    fn read_labelled(&mut self, lines: &[&str]) {
        let (mut draft, mut current) = match self.open.take() {
            Some(open) => open,
            None => (self.new_draft(), None),
        };

        for line in lines {
            if let Some((field, value)) = label_of(line) {
                // A label the entry already has starts the next entry
                if draft.get(field).is_some() {
                    let next = self.new_draft();
                    self.drafts.push(std::mem::replace(&mut draft, next));
                }
                draft.push(field, value);
                current = Some(field);
            } else {
                draft.push(current.unwrap_or(DraftField::Description), line);
            }
        }

        self.open = Some((draft, current));
    }

    /// Finish the open labelled entry, if any.
    fn close(&mut self) {
        if let Some((draft, _)) = self.open.take() {
            if !draft.is_empty() {
                self.drafts.push(draft);
            }
        }
    }

    fn read_rows(&mut self, lines: &[&str]) {
        let mut free_text = FreeText::default();
        let mut last_row: Option<usize> = None;

        for line in lines {
            let cells = split_cells(line);

            if cells.len() >= 2 {
                if let Some(mapping) = header_mapping(&cells) {
                    self.header = Some(mapping);
                    last_row = None;
                    continue;
                }
            }

            if cells.len() >= 3 && (self.header.is_some() || is_case_number(cells[0])) {
                let draft = self.row_draft(&cells);
                self.drafts.push(draft);
                last_row = Some(self.drafts.len() - 1);
                continue;
            }

            if let Some(idx) = last_row {
                // Wrapped description line under a row
                self.drafts[idx].push(DraftField::Description, line);
                continue;
            }

            if free_text.starts_next_entry(line) {
                let draft = self.free_text_draft(&free_text.take());
                self.drafts.push(draft);
            }
            free_text.push(*line);
        }

        if !free_text.is_empty() {
            let draft = self.free_text_draft(&free_text.take());
            self.drafts.push(draft);
        }
    }

    fn row_draft(&self, cells: &[&str]) -> DraftRecord {
        let mut draft = self.new_draft();

        match &self.header {
            Some(mapping) => {
                for (idx, cell) in cells.iter().enumerate() {
                    let field = mapping
                        .get(idx)
                        .copied()
                        .flatten()
                        .or_else(|| (idx >= mapping.len()).then_some(DraftField::Description));
                    if let Some(field) = field {
                        draft.push(field, cell);
                    }
                }
            }
            None => {
                let layout: &[DraftField] = match cells.len() {
                    3 => &[DraftField::CaseNumber, DraftField::Date, DraftField::Description],
                    4 => &[
                        DraftField::CaseNumber,
                        DraftField::Date,
                        DraftField::StatusType,
                        DraftField::Description,
                    ],
                    _ => &POSITIONAL,
                };
                for (idx, cell) in cells.iter().enumerate() {
                    let field = layout.get(idx).copied().unwrap_or(DraftField::Description);
                    draft.push(field, cell);
                }
            }
        }
        draft
    }

    fn free_text_draft(&self, text: &str) -> DraftRecord {
        let mut draft = self.new_draft();
        let mut rest = text.to_string();

        if let Some(m) = DATE_TOKEN.find(&rest) {
            draft.push(DraftField::Date, m.as_str());
            rest.replace_range(m.range(), " ");
        }
        if let Some(m) = CASE_TOKEN.find(&rest) {
            draft.push(DraftField::CaseNumber, m.as_str());
            rest.replace_range(m.range(), " ");
        }

        let description = normalize_whitespace(rest.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | '|' | ',' | ';')
        }));
        draft.push(DraftField::Description, &description);
        draft
    }
}

/// Free-text lines of the entry being read.
#[derive(Default)]
struct FreeText<'a> {
    lines: Vec<&'a str>,
    has_date: bool,
    has_case: bool,
}

impl<'a> FreeText<'a> {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, line: &'a str) {
        self.has_date |= DATE_TOKEN.is_match(line);
        self.has_case |= CASE_TOKEN.is_match(&DATE_TOKEN.replace_all(line, " "));
        self.lines.push(line);
    }

    /// A line opening with a date or case number the entry already has.
    fn starts_next_entry(&self, line: &str) -> bool {
        let line = line.trim_start();
        let opens_with = |re: &Regex| re.find(line).is_some_and(|m| m.start() == 0);

        if opens_with(&*DATE_TOKEN) {
            self.has_date
        } else if opens_with(&*CASE_TOKEN) {
            self.has_case
        } else {
            false
        }
    }

    fn take(&mut self) -> String {
        self.has_date = false;
        self.has_case = false;
        std::mem::take(&mut self.lines).join(" ")
    }
}

/// Recognised `Label: value` line.
fn label_of(line: &str) -> Option<(DraftField, &str)> {
    let caps = LABEL_LINE.captures(line)?;
    let field = DraftField::from_label(caps.get(1)?.as_str())?;
    Some((field, caps.get(2).map_or("", |m| m.as_str())))
}

fn split_cells(line: &str) -> Vec<&str> {
    CELL_SPLIT
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Column mapping if the cells read as a header row.
pub(crate) fn header_mapping(cells: &[&str]) -> Option<Vec<Option<DraftField>>> {
    let mapping: Vec<Option<DraftField>> = cells.iter().map(|c| DraftField::from_label(c)).collect();
    let known = mapping.iter().flatten().count();
    let has_case = mapping.contains(&Some(DraftField::CaseNumber));
    (has_case && known >= 2).then_some(mapping)
}

fn is_case_number(cell: &str) -> bool {
    CASE_TOKEN
        .find(cell)
        .is_some_and(|m| m.start() == 0 && !DATE_TOKEN.is_match(cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/j3/estados.pdf";

    #[test]
    fn test_labelled_blocks() {
        let text = "JUZGADO TERCERO CIVIL MUNICIPAL\nESTADOS\n\n\
                    Expediente: 2301-4521\n\
                    Fecha: 09/05/2025\n\
                    Clase: Proceso Verbal\n\
                    Actuación: Auto\n\
                    Descripción: Se admite demanda y se ordena\n\
                    notificar a la parte demandada.\n\n\
                    Expediente: 2302-0001\n\
                    Fecha: 08/05/2025\n\
                    Descripción: Se fija fecha para audiencia: 15 de mayo.\n";

        let drafts = segment(text, SourceFormat::Pdf, URL);
        assert_eq!(drafts.len(), 2);

        let first = &drafts[0];
        assert_eq!(first.sequence, 0);
        assert_eq!(first.get(DraftField::CaseNumber), Some("2301-4521"));
        assert_eq!(first.get(DraftField::Date), Some("09/05/2025"));
        assert_eq!(first.get(DraftField::CaseType), Some("Proceso Verbal"));
        assert_eq!(first.get(DraftField::StatusType), Some("Auto"));
        assert_eq!(
            first.get(DraftField::Description),
            Some("Se admite demanda y se ordena notificar a la parte demandada.")
        );

        let second = &drafts[1];
        assert_eq!(second.sequence, 1);
        assert_eq!(
            second.get(DraftField::Description),
            Some("Se fija fecha para audiencia: 15 de mayo.")
        );
        assert_eq!(second.source_format, SourceFormat::Pdf);
    }

    #[test]
    fn test_consecutive_entries_without_blank_line() {
        let text = "Expediente: 1\nFecha: 2025-05-09\nDescripción: a\n\
                    Expediente: 2\nFecha: 2025-05-08\nDescripción: b\n";
        let drafts = segment(text, SourceFormat::Image, URL);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].get(DraftField::CaseNumber), Some("2"));
        assert_eq!(drafts[1].get(DraftField::Description), Some("b"));
    }

    #[test]
    fn test_labelled_entry_spans_blank_lines() {
        let text = "Expediente: 2301-4521\n\nFecha: 09/05/2025\n\n\
                    Descripción: Se admite demanda\n\n\
                    Expediente: 2301-4522\n\nFecha: 08/05/2025\n";
        let drafts = segment(text, SourceFormat::Pdf, URL);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].get(DraftField::Date), Some("09/05/2025"));
        assert_eq!(drafts[0].get(DraftField::Description), Some("Se admite demanda"));
        assert_eq!(drafts[1].get(DraftField::CaseNumber), Some("2301-4522"));
        assert_eq!(drafts[1].sequence, 1);
    }

    #[test]
    fn test_column_rows_with_header() {
        let text = "Radicado    Fecha    Actuación    Anotación\n\
                    2023-00123    09/05/2025    Auto    Requiere al demandante\n\
                    \tpara aportar pruebas\n\
                    2023-00456    09/05/2025    Sentencia    Accede a pretensiones\n";

        let drafts = segment(text, SourceFormat::Pdf, URL);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].get(DraftField::CaseNumber), Some("2023-00123"));
        assert_eq!(drafts[0].get(DraftField::StatusType), Some("Auto"));
        assert_eq!(
            drafts[0].get(DraftField::Description),
            Some("Requiere al demandante para aportar pruebas")
        );
        assert_eq!(drafts[1].get(DraftField::StatusType), Some("Sentencia"));
    }

    #[test]
    fn test_positional_rows_without_header() {
        let text = "2301-4521  09/05/2025  Proceso Ejecutivo  Auto  Se decreta medida cautelar\n";
        let drafts = segment(text, SourceFormat::Pdf, URL);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get(DraftField::CaseType), Some("Proceso Ejecutivo"));
        assert_eq!(
            drafts[0].get(DraftField::Description),
            Some("Se decreta medida cautelar")
        );
    }

    #[test]
    fn test_free_text_block() {
        let text = "09/05/2025 - 2301-4521 Se concede recurso de apelación en efecto suspensivo.";
        let drafts = segment(text, SourceFormat::Image, URL);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get(DraftField::Date), Some("09/05/2025"));
        assert_eq!(drafts[0].get(DraftField::CaseNumber), Some("2301-4521"));
        assert_eq!(
            drafts[0].get(DraftField::Description),
            Some("Se concede recurso de apelación en efecto suspensivo.")
        );
    }

    #[test]
    fn test_single_spaced_rows_are_separate_entries() {
        let text = "2301-4521 09/05/2025 Auto Se admite demanda\n\
                    2301-4522 08/05/2025 Sentencia Accede a pretensiones\n\
                    2301-4523 07/05/2025 Traslado de excepciones\n";
        let drafts = segment(text, SourceFormat::Image, URL);

        let entries: Vec<_> = drafts
            .iter()
            .map(|d| {
                (
                    d.get(DraftField::CaseNumber),
                    d.get(DraftField::Date),
                    d.get(DraftField::Description),
                )
            })
            .collect();
        assert_eq!(
            entries,
            vec![
                (Some("2301-4521"), Some("09/05/2025"), Some("Auto Se admite demanda")),
                (Some("2301-4522"), Some("08/05/2025"), Some("Sentencia Accede a pretensiones")),
                (Some("2301-4523"), Some("07/05/2025"), Some("Traslado de excepciones")),
            ]
        );
        assert_eq!(drafts[2].sequence, 2);
    }

    #[test]
    fn test_free_text_entry_split_over_lines() {
        let text = "09/05/2025\n2301-4521 Se concede recurso\nde apelación.\n\
                    08/05/2025\n2301-4522 Se rechaza demanda.";
        let drafts = segment(text, SourceFormat::Image, URL);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].get(DraftField::CaseNumber), Some("2301-4521"));
        assert_eq!(
            drafts[0].get(DraftField::Description),
            Some("Se concede recurso de apelación.")
        );
        assert_eq!(drafts[1].get(DraftField::Date), Some("08/05/2025"));
        assert_eq!(drafts[1].get(DraftField::CaseNumber), Some("2301-4522"));
    }

    #[test]
    fn test_header_only_text_yields_nothing() {
        let text = "RAMA JUDICIAL\nJUZGADO PRIMERO CIVIL MUNICIPAL\n\nEl secretario";
        assert!(segment(text, SourceFormat::Pdf, URL).is_empty());
    }
}
