// src/pipeline/export.rs

//! Downloadable HTML documents for record batches and single cases.
//!
//! Rendering is a pure transformation over validated records; only
//! `ExportDocument::save` and `write_json` touch the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{Config, Court, CourtStatus, ExportConfig, default_court_name};
use crate::utils::text::{escape_html, sanitize_filename};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h1 { font-size: 18px; text-align: center; margin-bottom: 20px; }
h2 { font-size: 15px; margin-top: 28px; }
.meta { text-align: right; margin-bottom: 20px; font-size: 12px; }
.empty { text-align: center; color: #666; margin-top: 40px; }
.review { color: #b35c00; font-size: 11px; }
.section { background-color: #e6e6e6; font-weight: bold; padding: 10px; margin-bottom: 20px; }
.footer { margin-top: 30px; font-size: 12px; color: #666; }
table { width: 100%; border-collapse: collapse; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; vertical-align: top; }
th { background-color: #f2f2f2; }
table.detail th { width: 30%; }
";

/// A rendered, self-contained export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ExportDocument {
    fn html(filename: String, body: String) -> Self {
        Self {
            filename,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    /// Write the document into `dir`, returning the file path.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.filename);
        write_atomic(&path, self.body.as_bytes()).await?;
        Ok(path)
    }
}

/// Write any serializable value as pretty JSON.
pub async fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path.as_ref(), &bytes).await
}

/// Write to a temp file next to `path`, then rename over it.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// "9 de mayo de 2025"
pub fn spanish_long_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}

/// Renders batch and single-case exports.
#[derive(Debug, Clone)]
pub struct ExportGenerator {
    config: ExportConfig,
    court_names: BTreeMap<u32, String>,
}

impl ExportGenerator {
    pub fn new(config: ExportConfig, courts: &[Court]) -> Self {
        Self {
            config,
            court_names: courts.iter().map(|c| (c.id, c.name.clone())).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.export.clone(), &config.courts)
    }

    fn court_name(&self, court_id: u32) -> String {
        self.court_names
            .get(&court_id)
            .cloned()
            .unwrap_or_else(|| default_court_name(court_id))
    }

    /// Batch export dated today.
    pub fn export_batch(&self, records: &[CourtStatus], window_days: u32) -> ExportDocument {
        self.export_batch_on(records, window_days, Local::now().date_naive())
    }

    /// Batch export grouped by court ascending, records in incoming order
    /// within each group.
    pub fn export_batch_on(
        &self,
        records: &[CourtStatus],
        window_days: u32,
        generated: NaiveDate,
    ) -> ExportDocument {
        let title = format!(
            "{} - Últimos {} días hábiles",
            self.config.title, window_days
        );

        let mut groups: BTreeMap<u32, Vec<&CourtStatus>> = BTreeMap::new();
        for record in records {
            groups.entry(record.court_id).or_default().push(record);
        }

        let mut body = String::new();
        if groups.is_empty() {
            body.push_str(
                "<p class=\"empty\">No se encontraron estados que coincidan con los criterios seleccionados.</p>\n",
            );
        }

        for (court_id, group) in &groups {
            body.push_str(&format!(
                "<h2>{}</h2>\n<table>\n<thead><tr><th>Expediente</th><th>Fecha</th>\
                 <th>Tipo</th><th>Estado</th><th>Descripción</th></tr></thead>\n<tbody>\n",
                escape_html(&self.court_name(*court_id))
            ));
            for record in group {
                body.push_str(&format!(
                    "<tr><td>{}{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    escape_html(&record.case_number),
                    review_marker(record),
                    spanish_long_date(record.date),
                    escape_html(&record.case_type),
                    escape_html(&record.status_type),
                    escape_html(&record.description),
                ));
            }
            body.push_str("</tbody>\n</table>\n");
        }

        let filename = format!("estados-pendientes-{}.html", generated.format("%Y-%m-%d"));
        ExportDocument::html(filename, page(&title, generated, &body))
    }

    /// Single-case export dated today.
    pub fn export_single(&self, record: &CourtStatus) -> ExportDocument {
        self.export_single_on(record, Local::now().date_naive())
    }

    pub fn export_single_on(&self, record: &CourtStatus, generated: NaiveDate) -> ExportDocument {
        let court = self.court_name(record.court_id);
        let title = format!("Estado Pendiente - Expediente {} - {}", record.case_number, court);

        let rows = [
            ("Juzgado", escape_html(&court)),
            (
                "Número de Expediente",
                format!("{}{}", escape_html(&record.case_number), review_marker(record)),
            ),
            ("Fecha", spanish_long_date(record.date)),
            ("Tipo de Proceso", escape_html(&record.case_type)),
            ("Tipo de Estado", escape_html(&record.status_type)),
            ("Descripción", escape_html(&record.description)),
            ("Formato de Origen", record.source_format.to_string()),
        ];

        let mut body = String::from(
            "<div class=\"section\">Información del Estado</div>\n<table class=\"detail\">\n",
        );
        for (label, value) in rows {
            body.push_str(&format!("<tr><th>{label}</th><td>{value}</td></tr>\n"));
        }
        body.push_str("</table>\n");
        body.push_str(&format!(
            "<div class=\"footer\">{} La información contenida corresponde a los datos publicados por el {}.</div>\n",
            escape_html(&self.config.footer),
            escape_html(&court)
        ));

        let filename = format!(
            "expediente-{}-{}.html",
            sanitize_filename(&record.case_number),
            generated.format("%Y-%m-%d")
        );
        ExportDocument::html(filename, page(&title, generated, &body))
    }
}

fn review_marker(record: &CourtStatus) -> &'static str {
    if record.needs_review() {
        " <span class=\"review\">(revisar)</span>"
    } else {
        ""
    }
}

fn page(title: &str, generated: NaiveDate, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<div class=\"meta\">Fecha de generación: {}</div>\n\
         {body}</body>\n</html>\n",
        spanish_long_date(generated)
    )
}
