use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::{BatchResult, DocumentFailure, NormalizedProtocol};

/// Machine-readable batch output
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub metadata: ReportMetadata,
    pub protocols: Vec<NormalizedProtocol>,
    pub failures: Vec<DocumentFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub processed_at: DateTime<Utc>,
    pub total_submissions: usize,
    pub normalized: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl BatchReport {
    pub fn from_result(result: BatchResult) -> Self {
        let metadata = ReportMetadata {
            processed_at: Utc::now(),
            total_submissions: result.protocols.len() + result.failures.len(),
            normalized: result.protocols.len(),
            failed: result.failures.len(),
            warnings: result.warning_count(),
        };

        Self {
            metadata,
            protocols: result.protocols,
            failures: result.failures,
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Plain-text view of normalized protocols
pub struct ProtocolSummary<'a> {
    protocols: &'a [NormalizedProtocol],
}

impl<'a> ProtocolSummary<'a> {
    pub fn new(protocols: &'a [NormalizedProtocol]) -> Self {
        Self { protocols }
    }

    /// Format every protocol as a block of text
    pub fn format(&self) -> String {
        let mut output = String::new();

        for protocol in self.protocols {
            output.push_str(&format!(
                "PMID: {} | Participant ID: {}\n",
                protocol.publication_id, protocol.participant_id
            ));
            output.push_str(&format!(
                "Cells of origin: {} -> Target cells: {}\n",
                protocol.cell_line.cell_lines_display(),
                protocol.cell_line.targets_display()
            ));

            for step in &protocol.steps {
                output.push_str(&format!(
                    "\n[{}] {} ({:.0}% of timeline)\n",
                    step.label,
                    single_line(&step.duration.label),
                    step.proportion * 100.0
                ));
                let attributes = &step.attributes;
                push_field(&mut output, "Basal media", &attributes.basal_media.display());
                push_field(&mut output, "Serum and supplements", &attributes.supplements.display());
                push_field(&mut output, "Growth factors", &attributes.growth_factors.display());
                push_field(&mut output, "Culture matrix", &attributes.culture_matrix.display());
                if let Some(markers) = &attributes.gene_markers {
                    push_field(&mut output, "Readout", &markers.display());
                }
            }

            if !protocol.warnings.is_empty() {
                output.push_str("\nWarnings:\n");
                for warning in &protocol.warnings {
                    output.push_str(&format!("  - {}\n", warning));
                }
            }

            output.push_str("\n----------------------------------------\n\n");
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

fn push_field(output: &mut String, name: &str, value: &str) {
    output.push_str(&format!("  {}: {}\n", name, value));
}

/// Duration labels carry their unit on a second line
fn single_line(label: &str) -> String {
    label.replace('\n', " ")
}
