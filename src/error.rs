use serde::{Deserialize, Serialize};

use crate::models::{AttributeGroup, StepId};

/// Recoverable problems found while normalizing one document
///
/// None of these stop normalization: the affected field falls back to an
/// empty or default value and the warning is kept for the audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeWarning {
    /// A field expected to hold JSON text did not parse
    #[error("could not decode {field}: {message}")]
    Decode { field: String, message: String },

    /// One of the sentinel keys was absent, so its rename was skipped
    #[error("sentinel key {key:?} missing, rename skipped")]
    MissingSentinelKey { key: String },

    /// A top-level key is neither a sentinel nor a step number
    #[error("ignoring top-level key {key:?}: not a step number")]
    InvalidStepKey { key: String },

    /// The final-step rename target was already taken
    #[error("final step index {wanted} already in use, stored as step {assigned}")]
    StepKeyCollision { wanted: StepId, assigned: StepId },

    /// Duration text held no usable number
    #[error("step {step}: unresolvable duration {text:?}")]
    UnresolvableDuration { step: StepId, text: String },

    /// Attribute group or one of its entries had an unexpected shape
    #[error("step {step}: malformed {group}: {detail}")]
    MalformedAttributeGroup {
        step: StepId,
        group: AttributeGroup,
        detail: String,
    },
}

/// Failures that make a single document unusable
///
/// A batch records these per document and carries on with the rest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("merged_data is empty")]
    EmptyDocument,

    #[error("merged_data is not valid JSON: {0}")]
    Undecodable(String),

    #[error("merged_data is not a JSON object (found {0})")]
    NotAnObject(&'static str),
}

/// Short name of a JSON value's type, for messages
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
