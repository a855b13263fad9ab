// src/report/export.rs

//! Flat export of every stored quotation.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::Quote;
use crate::report::csv;

/// Columns of an exported row, in order.
pub const EXPORT_FIELDS: [&str; 7] = [
    "quote_id",
    "quote_text",
    "author_name",
    "author_url",
    "tags_json",
    "first_seen_at",
    "last_seen_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(AppError::validation(format!(
                "unknown export format '{other}' (expected csv or json)"
            ))),
        }
    }
}

/// One exported quotation with all persisted fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub quote_id: String,
    pub quote_text: String,
    pub author_name: String,
    pub author_url: Option<String>,
    pub tags_json: String,
    pub first_seen_at: String,
    pub last_seen_at: String,
}

impl From<&Quote> for ExportRow {
    fn from(quote: &Quote) -> Self {
        Self {
            quote_id: quote.quote_id.clone(),
            quote_text: quote.quote_text.clone(),
            author_name: quote.author_name.clone(),
            author_url: quote.author_url.clone(),
            tags_json: quote.tags_json(),
            first_seen_at: quote.first_seen_at.to_rfc3339(),
            last_seen_at: quote.last_seen_at.to_rfc3339(),
        }
    }
}

impl ExportRow {
    fn cells(self) -> Vec<String> {
        vec![
            self.quote_id,
            self.quote_text,
            self.author_name,
            self.author_url.unwrap_or_default(),
            self.tags_json,
            self.first_seen_at,
            self.last_seen_at,
        ]
    }
}

/// Render `quotes` in `format`.
pub fn render(quotes: &[Quote], format: ExportFormat) -> Result<String> {
    let rows = quotes.iter().map(ExportRow::from);

    match format {
        ExportFormat::Csv => {
            let cells: Vec<Vec<String>> = rows.map(ExportRow::cells).collect();
            Ok(csv::rows_to_string(&EXPORT_FIELDS, &cells, ',')?)
        }
        ExportFormat::Json => {
            let rows: Vec<ExportRow> = rows.collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
    }
}
