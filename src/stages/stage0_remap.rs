use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{DocumentError, NormalizeWarning, json_kind};
use crate::models::{ProtocolDocument, SentinelKey, StepId};

/// Result of Stage 0 key remapping
#[derive(Debug, Clone)]
pub struct RemapResult {
    /// Typed document with sentinel entries folded into named fields
    pub document: ProtocolDocument,
    /// Payload of the `"1000"` entry, placed by [`place_final_step`]
    pub final_payload: Option<Value>,
    /// Recoverable problems found while remapping
    pub warnings: Vec<NormalizeWarning>,
}

/// Result of placing the final step after the numeric steps
#[derive(Debug, Clone)]
pub struct FinalStepPlacement {
    pub document: ProtocolDocument,
    /// Step id the `"1000"` entry was stored under, if present
    pub final_step: Option<StepId>,
    pub warning: Option<NormalizeWarning>,
}

/// Decode a submission's `merged_data` blob into a top-level mapping
///
/// Accepts JSON text or an already-decoded object.
pub fn decode_document(merged_data: &Value) -> Result<Map<String, Value>, DocumentError> {
    let decoded = match merged_data {
        Value::Null => return Err(DocumentError::EmptyDocument),
        Value::String(text) if text.trim().is_empty() => return Err(DocumentError::EmptyDocument),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|e| DocumentError::Undecodable(e.to_string()))?,
        other => other.clone(),
    };

    match decoded {
        Value::Object(map) => Ok(map),
        other => Err(DocumentError::NotAnObject(json_kind(&other))),
    }
}

/// Perform Stage 0: fold sentinel keys into a typed document
///
/// - `"1000"` is set aside in `final_payload`
/// - `"1001"` becomes `sequencing_data`
/// - `"-1"` becomes `cell_line`
///
/// String-encoded payloads are decoded on the way. The raw mapping is not
/// modified.
pub fn remap_keys(raw: &Map<String, Value>) -> RemapResult {
    let mut warnings = Vec::new();
    let mut document = ProtocolDocument::default();
    let mut final_payload = None;

    for (key, value) in raw {
        let sentinel = SentinelKey::from_raw_key(key).or_else(|| SentinelKey::from_canonical_name(key));

        match sentinel {
            Some(SentinelKey::FinalStep) => {
                final_payload = Some(decode_payload(key, value, &mut warnings));
            }
            Some(SentinelKey::SequencingData) => {
                document.sequencing_data = Some(decode_payload(key, value, &mut warnings));
            }
            Some(SentinelKey::CellLine) => {
                document.cell_line = Some(decode_payload(key, value, &mut warnings));
            }
            None => match key.trim().parse::<StepId>() {
                Ok(id) => {
                    let payload = decode_payload(key, value, &mut warnings);
                    document.steps.insert(id, payload);
                }
                Err(_) => {
                    warn!("Ignoring top-level key {:?}", key);
                    warnings.push(NormalizeWarning::InvalidStepKey { key: key.clone() });
                }
            },
        }
    }

    for sentinel in SentinelKey::ALL {
        let present = match sentinel {
            SentinelKey::FinalStep => final_payload.is_some(),
            SentinelKey::SequencingData => document.sequencing_data.is_some(),
            SentinelKey::CellLine => document.cell_line.is_some(),
        };
        if !present {
            warn!("Sentinel key {:?} missing, skipping rename", sentinel.raw_key());
            warnings.push(NormalizeWarning::MissingSentinelKey {
                key: sentinel.raw_key().to_string(),
            });
        }
    }

    debug!(
        "Remapped document: {} steps, final step {}, {} warnings",
        document.step_count(),
        if final_payload.is_some() { "pending" } else { "absent" },
        warnings.len()
    );

    RemapResult {
        document,
        final_payload,
        warnings,
    }
}

/// Store the `"1000"` payload as the step after the numeric range
///
/// Runs after pruning, so the index is the number of numeric steps left
/// and removed placeholders leave no gap. When that index is taken the
/// next free one is used. A null payload (empty or undecodable entry) has
/// nothing to render and is not stored.
pub fn place_final_step(
    mut document: ProtocolDocument,
    payload: Option<Value>,
) -> FinalStepPlacement {
    let mut warning = None;

    let final_step = payload.filter(|p| !p.is_null()).map(|payload| {
        let wanted = document.step_count() as StepId;
        let assigned = if document.steps.contains_key(&wanted) {
            let next = document.max_step_id().map_or(0, |max| max.saturating_add(1));
            warn!("Final step index {} already used, storing as {}", wanted, next);
            warning = Some(NormalizeWarning::StepKeyCollision { wanted, assigned: next });
            next
        } else {
            wanted
        };
        document.steps.insert(assigned, payload);
        assigned
    });

    FinalStepPlacement {
        document,
        final_step,
        warning,
    }
}

/// Decode a JSON-encoded entry; undecodable text is treated as absent
fn decode_payload(key: &str, value: &Value, warnings: &mut Vec<NormalizeWarning>) -> Value {
    match value {
        Value::String(text) if text.trim().is_empty() => Value::Null,
        Value::String(text) => match serde_json::from_str(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Entry {:?} is not valid JSON: {}", key, e);
                warnings.push(NormalizeWarning::Decode {
                    field: key.to_string(),
                    message: e.to_string(),
                });
                Value::Null
            }
        },
        other => other.clone(),
    }
}
