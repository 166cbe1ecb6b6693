use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::step::{first_entry_field, given_flag};
use crate::models::{ProtocolDocument, StepId};

/// Id of the optional culturing step
pub const CULTURING_STEP: StepId = 0;

/// A step selected for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub id: StepId,
    /// `"Culturing"` for step 0, `"Step {n}"` otherwise
    pub label: String,
}

/// Result of Stage 2 step resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    /// Whether the culturing step is part of the protocol
    pub culturing: bool,
    /// Steps to render, in ascending numeric order
    pub steps: Vec<PlannedStep>,
}

impl StepPlan {
    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }
}

pub fn step_label(id: StepId) -> String {
    if id == CULTURING_STEP {
        "Culturing".to_string()
    } else {
        format!("Step {}", id)
    }
}

/// Read `culturingProtocol[0].isGiven` from the culturing step
///
/// `false` and numeric zero mean not given. Anything else, including a
/// missing step or field, counts as given.
pub fn culturing_flag(document: &ProtocolDocument) -> bool {
    document
        .step(CULTURING_STEP)
        .and_then(Value::as_object)
        .and_then(|fields| first_entry_field(fields, "culturingProtocol", "isGiven"))
        .and_then(given_flag)
        .unwrap_or(true)
}

/// Perform Stage 2: choose and order the steps to render
///
/// Sentinel entries are not steps, so they never appear here. Step ids are
/// integers, so ordering is numeric (`0, 1, 2, 10`).
pub fn resolve_steps(document: &ProtocolDocument) -> StepPlan {
    let culturing = culturing_flag(document);

    let steps: Vec<PlannedStep> = document
        .steps
        .keys()
        .copied()
        .filter(|&id| culturing || id != CULTURING_STEP)
        .map(|id| PlannedStep {
            id,
            label: step_label(id),
        })
        .collect();

    debug!(
        "Resolved {} steps (culturing={})",
        steps.len(),
        culturing
    );

    StepPlan { culturing, steps }
}
