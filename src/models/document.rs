use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric step identifier. `0` is the optional culturing step.
pub type StepId = u32;

/// Out-of-band keys used by the submission form inside an otherwise
/// numeric keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelKey {
    /// `"1000"`: the final differentiation step
    FinalStep,
    /// `"1001"`: sequencing metadata
    SequencingData,
    /// `"-1"`: cell line of origin and differentiation target
    CellLine,
}

impl SentinelKey {
    pub const ALL: [SentinelKey; 3] = [
        SentinelKey::FinalStep,
        SentinelKey::SequencingData,
        SentinelKey::CellLine,
    ];

    /// Key as it appears in the raw document
    pub fn raw_key(self) -> &'static str {
        match self {
            SentinelKey::FinalStep => "1000",
            SentinelKey::SequencingData => "1001",
            SentinelKey::CellLine => "-1",
        }
    }

    /// Stable name used once the document is normalized
    pub fn canonical_name(self) -> &'static str {
        match self {
            SentinelKey::FinalStep => "finalStep",
            SentinelKey::SequencingData => "sequencingData",
            SentinelKey::CellLine => "cellLine",
        }
    }

    pub fn from_raw_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.raw_key() == key)
    }

    /// Accepts already-normalized names so re-ingesting a normalized
    /// document is harmless
    pub fn from_canonical_name(key: &str) -> Option<Self> {
        match key {
            "sequencingData" => Some(SentinelKey::SequencingData),
            "cellLine" => Some(SentinelKey::CellLine),
            _ => None,
        }
    }
}

/// A submission's protocol after sentinel keys have been folded away
///
/// Step payloads are kept as decoded JSON; they are parsed into
/// [`StepRecord`](super::StepRecord) only when a step is rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDocument {
    /// Step payloads keyed by numeric id (iterates in numeric order)
    pub steps: BTreeMap<StepId, Value>,
    /// Decoded `cellLine` entry, if the submission carried one
    #[serde(rename = "cellLine")]
    pub cell_line: Option<Value>,
    /// Decoded `sequencingData` entry, passed through untouched
    #[serde(rename = "sequencingData")]
    pub sequencing_data: Option<Value>,
}

impl ProtocolDocument {
    pub fn step(&self, id: StepId) -> Option<&Value> {
        self.steps.get(&id)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn max_step_id(&self) -> Option<StepId> {
        self.steps.keys().next_back().copied()
    }
}
