//! Export of fetched content to local files as text, CSV or JSON.

use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Text,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Guess from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::validation(format!(
                "unknown export format '{}' (expected txt, csv or json)",
                other
            ))),
        }
    }
}

/// Render `value` in `format`.
pub fn render(value: &Value, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Text => Ok(match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)?,
        }),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        ExportFormat::Csv => to_csv(value),
    }
}

/// CSV from an array of flat objects (a single object is one row).
///
/// The header is the union of keys in first-seen order. Missing cells are
/// empty and nested values are written as compact JSON.
pub fn to_csv(value: &Value) -> Result<String> {
    let rows: Vec<&serde_json::Map<String, Value>> = match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object().ok_or_else(|| {
                    Error::validation_with_context(
                        "CSV export needs an array of objects",
                        ErrorContext::new()
                            .with_field_path(format!("[{}]", i))
                            .with_source("export"),
                    )
                })
            })
            .collect::<Result<_>>()?,
        Value::Object(obj) => vec![obj],
        _ => {
            return Err(Error::validation_with_context(
                "CSV export needs an array of objects",
                ErrorContext::new().with_source("export"),
            ))
        }
    };

    let mut header: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }

    if header.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;
    for row in &rows {
        writer
            .write_record(
                header
                    .iter()
                    .map(|h| row.get(*h).map(cell_text).unwrap_or_default()),
            )
            .map_err(csv_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv_error(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|e| {
        Error::runtime_with_context(
            "CSV output is not valid UTF-8",
            ErrorContext::new()
                .with_source("export")
                .with_details(e.to_string()),
        )
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        nested => nested.to_string(),
    }
}

fn csv_error(e: csv::Error) -> Error {
    Error::runtime_with_context(
        "failed to write CSV",
        ErrorContext::new()
            .with_source("export")
            .with_details(e.to_string()),
    )
}

/// Render and write to `path`, replacing any existing file.
pub async fn export_to(path: impl AsRef<Path>, value: &Value, format: ExportFormat) -> Result<()> {
    let path = path.as_ref();
    let rendered = render(value, format)?;
    tokio::fs::write(path, rendered.as_bytes()).await?;
    info!(path = %path.display(), format = %format, bytes = rendered.len(), "export written");
    Ok(())
}
