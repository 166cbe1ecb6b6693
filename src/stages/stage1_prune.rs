use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::models::{ProtocolDocument, StepId};

/// Steps kept even when vacuous; step 0 carries the culturing flag
pub const RETAINED_STEPS: [StepId; 1] = [0];

/// Result of Stage 1 pruning
#[derive(Debug, Clone)]
pub struct PruneResult {
    pub document: ProtocolDocument,
    /// Ids of the removed steps, ascending
    pub removed: Vec<StepId>,
}

/// Whether every leaf of a JSON subtree is null, an empty string or `false`
///
/// Numbers, including zero, are real values.
pub fn is_vacuous(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(_) => false,
        Value::Array(items) => items.iter().all(is_vacuous),
        Value::Object(map) => map.values().all(is_vacuous),
    }
}

/// Perform Stage 1: drop step branches whose whole subtree is vacuous
///
/// The cell line and sequencing entries live outside `steps` and are never
/// touched.
pub fn prune_empty_steps(document: ProtocolDocument) -> PruneResult {
    let ProtocolDocument {
        steps,
        cell_line,
        sequencing_data,
    } = document;

    let mut removed = Vec::new();
    let steps: BTreeMap<StepId, Value> = steps
        .into_iter()
        .filter(|(id, payload)| {
            let keep = RETAINED_STEPS.contains(id) || !is_vacuous(payload);
            if !keep {
                removed.push(*id);
            }
            keep
        })
        .collect();

    if !removed.is_empty() {
        debug!("Pruned {} empty steps: {:?}", removed.len(), removed);
    }

    PruneResult {
        document: ProtocolDocument {
            steps,
            cell_line,
            sequencing_data,
        },
        removed,
    }
}
