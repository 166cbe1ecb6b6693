use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{SubmissionRecord, normalize_id};

/// Supported submission table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    /// A JSON array of records
    Json,
    /// One JSON record per line
    JsonLines,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            "jsonl" | "ndjson" => Ok(SourceFormat::JsonLines),
            other => bail!("Unsupported submission file extension {:?}: {:?}", other, path),
        }
    }
}

/// A CSV row; every column is text
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    participant_id: String,
    #[serde(default)]
    publication_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    merged_data: String,
}

impl From<CsvRow> for SubmissionRecord {
    fn from(row: CsvRow) -> Self {
        let merged_data = if row.merged_data.trim().is_empty() {
            Value::Null
        } else {
            Value::String(row.merged_data)
        };

        SubmissionRecord {
            participant_id: normalize_id(&row.participant_id),
            publication_id: normalize_id(&row.publication_id),
            status: row.status.trim().to_string(),
            merged_data,
        }
    }
}

/// Read a submission table, picking the format from the file extension
pub fn read_submissions_file(path: &Path) -> Result<Vec<SubmissionRecord>> {
    let format = SourceFormat::from_path(path)?;
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_submissions(&content, format)
}

/// Parse submission records from text in the given format
pub fn parse_submissions(content: &str, format: SourceFormat) -> Result<Vec<SubmissionRecord>> {
    match format {
        SourceFormat::Csv => parse_csv(content),
        SourceFormat::Json => {
            serde_json::from_str(content).context("Failed to parse submissions JSON")
        }
        SourceFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse submission on line {}", i + 1))
            })
            .collect(),
    }
}

fn parse_csv(content: &str) -> Result<Vec<SubmissionRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| {
            row.map(SubmissionRecord::from)
                .with_context(|| format!("Failed to parse CSV row {}", i + 1))
        })
        .collect()
}
