use serde::{Deserialize, Serialize};

/// Resolved length of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationSpec {
    /// Canonical length in hours (fallback value when unspecified)
    pub hours: f64,
    /// Length used for layout, raised to the configured floor
    pub layout_hours: f64,
    /// Display text, unit on its own line (`"72\nhours"`)
    pub label: String,
    /// False when the fallback policy supplied the value
    pub specified: bool,
}
