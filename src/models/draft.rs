//! Draft records: extractor output before validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SourceFormat;
use crate::utils::text::fold_label;

/// Field of a draft record that the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DraftField {
    Id,
    CaseNumber,
    Date,
    CaseType,
    StatusType,
    Description,
}

impl DraftField {
    pub fn name(&self) -> &'static str {
        match self {
            DraftField::Id => "id",
            DraftField::CaseNumber => "caseNumber",
            DraftField::Date => "date",
            DraftField::CaseType => "caseType",
            DraftField::StatusType => "statusType",
            DraftField::Description => "description",
        }
    }

    /// Map a column header or `Label:` prefix as published by the courts.
    ///
    /// Matching ignores case, accents and trailing punctuation. Returns
    /// `None` for labels we don't care about.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = fold_label(label);
        let label = label.as_str();

        // Longer phrases first so "tipo de proceso" doesn't land on "tipo"
        const TABLE: &[(&str, DraftField)] = &[
            ("tipo de proceso", DraftField::CaseType),
            ("clase de proceso", DraftField::CaseType),
            ("tipo de estado", DraftField::StatusType),
            ("tipo de actuacion", DraftField::StatusType),
            ("numero de expediente", DraftField::CaseNumber),
            ("no. expediente", DraftField::CaseNumber),
            ("expediente", DraftField::CaseNumber),
            ("radicado", DraftField::CaseNumber),
            ("radicacion", DraftField::CaseNumber),
            ("fecha de estado", DraftField::Date),
            ("fecha de publicacion", DraftField::Date),
            ("fecha", DraftField::Date),
            ("clase", DraftField::CaseType),
            ("proceso", DraftField::CaseType),
            ("actuacion", DraftField::StatusType),
            ("estado", DraftField::StatusType),
            ("tipo", DraftField::StatusType),
            ("descripcion", DraftField::Description),
            ("anotacion", DraftField::Description),
            ("observacion", DraftField::Description),
            ("observaciones", DraftField::Description),
            ("detalle", DraftField::Description),
            ("id", DraftField::Id),
        ];

        TABLE
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, field)| *field)
    }
}

/// Soft warning attached to a draft (and carried onto the canonical record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DraftWarning {
    /// OCR confidence fell below the configured threshold
    LowConfidenceExtraction { confidence: f32, threshold: f32 },

    /// PDF had no text layer and was re-routed through OCR
    PdfOcrFallback,
}

// Confidences come from OCR output and are never NaN.
impl Eq for DraftWarning {}

/// Loosely-typed extractor output.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    /// Raw field values keyed by the field they were recognised as
    pub fields: BTreeMap<DraftField, String>,

    /// Format of the extractor that produced the draft
    pub source_format: SourceFormat,

    /// Source the draft was read from
    pub source_url: String,

    /// Position of the draft within its source
    pub sequence: usize,

    pub warnings: Vec<DraftWarning>,
}

impl DraftRecord {
    pub fn new(source_format: SourceFormat, source_url: impl Into<String>, sequence: usize) -> Self {
        Self {
            fields: BTreeMap::new(),
            source_format,
            source_url: source_url.into(),
            sequence,
            warnings: Vec::new(),
        }
    }

    /// Set a field, appending to an existing value with a space.
    ///
    /// Continuation lines in PDF/OCR text land on the same field twice.
    pub fn push(&mut self, field: DraftField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.fields
            .entry(field)
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    pub fn with(mut self, field: DraftField, value: &str) -> Self {
        self.push(field, value);
        self
    }

    pub fn get(&self, field: DraftField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(DraftField::from_label("Expediente"), Some(DraftField::CaseNumber));
        assert_eq!(DraftField::from_label("  FECHA: "), Some(DraftField::Date));
        assert_eq!(DraftField::from_label("Tipo de Proceso"), Some(DraftField::CaseType));
        assert_eq!(DraftField::from_label("Descripción"), Some(DraftField::Description));
        assert_eq!(DraftField::from_label("Actuación"), Some(DraftField::StatusType));
        assert_eq!(DraftField::from_label("Demandante"), None);
    }

    #[test]
    fn test_push_appends_continuation() {
        let mut draft = DraftRecord::new(SourceFormat::Pdf, "file:///x.pdf", 0);
        draft.push(DraftField::Description, "Se admite demanda");
        draft.push(DraftField::Description, "  y se ordena notificar. ");
        draft.push(DraftField::CaseType, "   ");

        assert_eq!(
            draft.get(DraftField::Description),
            Some("Se admite demanda y se ordena notificar.")
        );
        assert_eq!(draft.get(DraftField::CaseType), None);
    }
}
