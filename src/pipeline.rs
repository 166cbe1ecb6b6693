use std::path::Path;

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{DocumentError, NormalizeWarning};
use crate::models::{
    CellLineInfo, DurationSpec, ProtocolDocument, StepId, StepRecord, SubmissionRecord,
};
use crate::stages::{
    AttributeConfig, CULTURING_STEP, DurationConfig, LayoutConfig, StepAttributes,
    balance_proportions, decode_document, extract_step_attributes, place_final_step,
    prune_empty_steps, remap_keys, resolve_step_duration, resolve_steps,
};

/// All knobs of the normalization pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub duration: DurationConfig,
    pub layout: LayoutConfig,
    pub attributes: AttributeConfig,
}

impl PipelineConfig {
    /// Load from a JSON file; omitted fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Self =
            serde_json::from_str(&content).context("Failed to parse pipeline config")?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    /// Reject knob values the stages cannot work with
    pub fn validate(&self) -> Result<()> {
        let duration = &self.duration;
        if !duration.fallback_hours.is_finite() || duration.fallback_hours < 0.0 {
            bail!("fallback_hours must be a non-negative number, got {}", duration.fallback_hours);
        }
        if let Some(floor) = duration.min_layout_hours {
            if !floor.is_finite() || floor < 0.0 {
                bail!("min_layout_hours must be a non-negative number, got {}", floor);
            }
        }

        let layout = &self.layout;
        if !(0.0..1.0).contains(&layout.min_share) {
            bail!("min_share must be in [0, 1), got {}", layout.min_share);
        }
        if !layout.transfer_step.is_finite() || layout.transfer_step <= 0.0 {
            bail!("transfer_step must be positive, got {}", layout.transfer_step);
        }

        Ok(())
    }
}

/// One step ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedStep {
    pub id: StepId,
    pub label: String,
    pub duration: DurationSpec,
    /// Share of the timeline width
    pub proportion: f64,
    pub attributes: StepAttributes,
}

/// Normalized form of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProtocol {
    pub participant_id: String,
    pub publication_id: String,
    pub cell_line: CellLineInfo,
    pub culturing: bool,
    /// Steps in render order
    pub steps: Vec<RenderedStep>,
    /// Timeline proportions, parallel to `steps`
    pub proportions: Vec<f64>,
    /// Steps dropped for being empty
    pub removed_steps: Vec<StepId>,
    pub document: ProtocolDocument,
    pub warnings: Vec<NormalizeWarning>,
}

/// A submission that could not be normalized at all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub participant_id: String,
    pub publication_id: String,
    pub error: String,
}

/// Outcome of normalizing a batch, in input order
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub protocols: Vec<NormalizedProtocol>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchResult {
    pub fn warning_count(&self) -> usize {
        self.protocols.iter().map(|p| p.warnings.len()).sum()
    }
}

/// Run every stage over one decoded document
///
/// Never fails: problems inside the document become warnings.
pub fn normalize_document(raw: &Map<String, Value>, config: &PipelineConfig) -> NormalizedProtocol {
    // Stage 0: sentinel keys -> typed document
    let remapped = remap_keys(raw);
    let mut warnings = remapped.warnings;

    // Stage 1: drop empty step branches, then number the final step
    let pruned = prune_empty_steps(remapped.document);
    let placed = place_final_step(pruned.document, remapped.final_payload);
    warnings.extend(placed.warning);
    let document = placed.document;

    // Stage 2: steps to render
    let plan = resolve_steps(&document);

    // Stages 3 and 4, per step
    let mut steps = Vec::with_capacity(plan.steps.len());
    for planned in &plan.steps {
        let payload = document.step(planned.id).unwrap_or(&Value::Null);
        let (record, record_warnings) = StepRecord::from_payload(planned.id, payload);
        warnings.extend(record_warnings);

        let (duration, duration_warning) =
            resolve_step_duration(planned.id, record.duration_text.as_deref(), &config.duration);
        warnings.extend(duration_warning);

        let attributes =
            extract_step_attributes(&record, planned.id != CULTURING_STEP, &config.attributes);

        steps.push(RenderedStep {
            id: planned.id,
            label: planned.label.clone(),
            duration,
            proportion: 0.0,
            attributes,
        });
    }

    // Stage 5: layout over all steps
    let lengths: Vec<f64> = steps.iter().map(|s| s.duration.layout_hours).collect();
    let proportions = balance_proportions(&lengths, &config.layout);
    for (step, share) in steps.iter_mut().zip(&proportions) {
        step.proportion = *share;
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    NormalizedProtocol {
        participant_id: String::new(),
        publication_id: String::new(),
        cell_line: CellLineInfo::from_entry(document.cell_line.as_ref()),
        culturing: plan.culturing,
        steps,
        proportions,
        removed_steps: pruned.removed,
        document,
        warnings,
    }
}

/// Normalize one submission record
pub fn normalize_submission(
    record: &SubmissionRecord,
    config: &PipelineConfig,
) -> Result<NormalizedProtocol, DocumentError> {
    let raw = decode_document(&record.merged_data)?;
    let mut protocol = normalize_document(&raw, config);
    protocol.participant_id = record.participant_id.clone();
    protocol.publication_id = record.publication_id.clone();

    debug!(
        "Normalized {} / {}: {} steps, {} warnings",
        record.publication_id,
        record.participant_id,
        protocol.steps.len(),
        protocol.warnings.len()
    );

    Ok(protocol)
}

/// Normalize many submissions in parallel
///
/// Documents are independent; a failing document is recorded and the
/// rest carry on. Output keeps the input order.
pub fn normalize_batch(records: &[SubmissionRecord], config: &PipelineConfig) -> BatchResult {
    info!("Normalizing {} submissions", records.len());

    let outcomes: Vec<_> = records
        .par_iter()
        .map(|record| (record, normalize_submission(record, config)))
        .collect();

    let mut result = BatchResult::default();
    for (record, outcome) in outcomes {
        match outcome {
            Ok(protocol) => result.protocols.push(protocol),
            Err(e) => {
                warn!(
                    "Skipping PMID {} | Participant ID {}: {}",
                    record.publication_id, record.participant_id, e
                );
                result.failures.push(DocumentFailure {
                    participant_id: record.participant_id.clone(),
                    publication_id: record.publication_id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Normalized {} submissions, {} failed, {} warnings",
        result.protocols.len(),
        result.failures.len(),
        result.warning_count()
    );

    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_merged_data() -> Value {
        let step = |duration: &str, media: Value| {
            json!({
                "duration": [{"durationHours": duration}],
                "basalMedia": media,
                "SerumAndSupplements": [{"name": "B27"}],
                "growthFactor": [{"name": "-"}],
                "geneMarkers": [{"name": "SOX2", "geneEnrichment": "upregulated"}]
            })
            .to_string()
        };

        let mut culturing: Value = serde_json::from_str(&step("2 days", json!([{"name": "mTeSR1"}]))).unwrap();
        culturing["culturingProtocol"] = json!([{"isGiven": true}]);

        json!({
            "0": culturing.to_string(),
            "1": step("2 weeks", json!([{"name": "DMEM"}, {"name": "-"}, {"name": "F12"}])),
            "2": json!({"duration": [{"durationHours": ""}], "basalMedia": [{"name": ""}]}).to_string(),
            "1000": step("3-5 days", json!({"0": {"name": "RPMI"}})),
            "1001": json!({"platform": "scRNA-seq"}).to_string(),
            "-1": json!({
                "cellLineDetails": [{"cellLineName": "  H9. "}],
                "differentiationTarget": [{"targetCell": "cardiomyocytes."}]
            }).to_string()
        })
        .to_string()
        .into()
    }

    #[test]
    fn test_normalize_submission_end_to_end() {
        let record = SubmissionRecord::new("42", "35123456", sample_merged_data());
        let protocol = normalize_submission(&record, &PipelineConfig::default()).unwrap();

        assert_eq!(protocol.participant_id, "42");
        assert!(protocol.culturing);
        assert_eq!(protocol.cell_line.cell_lines, vec!["H9"]);
        assert_eq!(protocol.cell_line.targets_display(), "cardiomyocytes");

        // Empty step 2 is pruned first, so the final step takes its place
        assert_eq!(protocol.removed_steps, vec![2]);
        let ids: Vec<_> = protocol.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(protocol.steps[0].label, "Culturing");
        assert_eq!(protocol.steps[2].label, "Step 2");

        assert_eq!(protocol.steps[0].duration.hours, 48.0);
        assert_eq!(protocol.steps[1].duration.hours, 336.0);
        assert_eq!(protocol.steps[2].duration.hours, 72.0);

        let step1 = &protocol.steps[1].attributes;
        assert_eq!(step1.basal_media.display(), "DMEM, F12");
        assert_eq!(step1.growth_factors.display(), "Not specified");
        assert_eq!(step1.gene_markers.as_ref().unwrap().display(), "SOX2 ↑");
        assert_eq!(protocol.steps[2].attributes.basal_media.display(), "RPMI");
        assert_eq!(protocol.steps[0].attributes.gene_markers, None);

        let total: f64 = protocol.proportions.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(protocol.proportions.iter().all(|&p| p >= 0.1 - 1e-9));
        assert_eq!(protocol.steps[1].proportion, protocol.proportions[1]);
        assert!(protocol.warnings.is_empty());
        assert_eq!(protocol.document.sequencing_data, Some(json!({"platform": "scRNA-seq"})));
    }

    #[test]
    fn test_pruned_steps_leave_no_gap_before_final_step() {
        let merged = json!({
            "0": {"culturingProtocol": [{"isGiven": true}]},
            "1": {"duration": [{"durationHours": "24"}]},
            "2": {"duration": [{"durationHours": ""}]},
            "3": {"basalMedia": [{"name": null}]},
            "1000": {"duration": [{"durationHours": "48"}]},
            "1001": {}, "-1": {}
        });
        let record = SubmissionRecord::new("1", "2", merged);
        let protocol = normalize_submission(&record, &PipelineConfig::default()).unwrap();

        assert_eq!(protocol.removed_steps, vec![2, 3]);
        let labels: Vec<_> = protocol.steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Culturing", "Step 1", "Step 2"]);
        assert_eq!(protocol.steps[2].duration.hours, 48.0);
        assert!(protocol.warnings.is_empty());
    }

    #[test]
    fn test_culturing_not_given_is_not_rendered() {
        let merged = json!({
            "0": {"culturingProtocol": [{"isGiven": false}]},
            "1": {"duration": [{"durationHours": "24"}]},
            "1000": {"duration": [{"durationHours": "24"}]},
            "1001": {}, "-1": {}
        });
        let record = SubmissionRecord::new("1", "2", merged);
        let protocol = normalize_submission(&record, &PipelineConfig::default()).unwrap();

        assert!(!protocol.culturing);
        let ids: Vec<_> = protocol.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(protocol.proportions, vec![0.5, 0.5]);
    }

    #[test]
    fn test_degraded_document_collects_warnings() {
        let merged = json!({
            "1": {"duration": [{"durationHours": "until confluent"}], "basalMedia": "DMEM"},
            "1000": "{oops"
        });
        let record = SubmissionRecord::new("1", "2", merged);
        let protocol = normalize_submission(&record, &PipelineConfig::default()).unwrap();

        let kinds: Vec<_> = protocol
            .warnings
            .iter()
            .map(|w| serde_json::to_value(w).unwrap()["kind"].as_str().unwrap().to_string())
            .collect();
        assert!(kinds.contains(&"decode".to_string()));
        assert!(kinds.contains(&"missing_sentinel_key".to_string()));
        assert!(kinds.contains(&"unresolvable_duration".to_string()));
        assert!(kinds.contains(&"malformed_attribute_group".to_string()));

        assert_eq!(protocol.steps.len(), 1);
        assert_eq!(protocol.steps[0].duration.label, "Not specified");
        assert_eq!(protocol.proportions, vec![1.0]);
    }

    #[test]
    fn test_batch_isolates_bad_documents() {
        let records = vec![
            SubmissionRecord::new("1", "10", json!({"1": {"a": 1}, "1000": {}, "1001": {}, "-1": {}})),
            SubmissionRecord::new("2", "10", json!("{not json")),
            SubmissionRecord::new("3", "11", Value::Null),
            SubmissionRecord::new("4", "11", json!({"1": {"a": 1}, "1000": {}, "1001": {}, "-1": {}})),
        ];

        let result = normalize_batch(&records, &PipelineConfig::default());

        assert_eq!(result.protocols.len(), 2);
        assert_eq!(result.protocols[0].participant_id, "1");
        assert_eq!(result.protocols[1].participant_id, "4");
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].participant_id, "2");
        assert!(result.failures[1].error.contains("empty"));
    }

    #[test]
    fn test_config_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"duration": {"fallback_hours": 96.0}}"#).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();

        assert_eq!(config.duration.fallback_hours, 96.0);
        assert_eq!(config.duration.min_layout_hours, Some(35.0));
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_config_rejects_unusable_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"layout": {"transfer_step": 0.0}}"#).unwrap();

        let err = PipelineConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("transfer_step"));

        let mut config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        config.layout.min_share = 1.5;
        assert!(config.validate().is_err());
        config.layout.min_share = 0.1;
        config.duration.fallback_hours = f64::NAN;
        assert!(config.validate().is_err());
    }
}
