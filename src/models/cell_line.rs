use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NOT_SPECIFIED: &str = "Not specified";

/// Cells of origin and differentiation targets from the `cellLine` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLineInfo {
    /// `cellLineDetails[].cellLineName`, in submission order
    pub cell_lines: Vec<String>,
    /// `differentiationTarget[].targetCell`, in submission order
    pub targets: Vec<String>,
}

impl CellLineInfo {
    pub fn from_entry(entry: Option<&Value>) -> Self {
        let Some(entry) = entry else {
            return Self::default();
        };

        Self {
            cell_lines: collect_names(entry.get("cellLineDetails"), "cellLineName"),
            targets: collect_names(entry.get("differentiationTarget"), "targetCell"),
        }
    }

    pub fn cell_lines_display(&self) -> String {
        join_or_not_specified(&self.cell_lines)
    }

    pub fn targets_display(&self) -> String {
        join_or_not_specified(&self.targets)
    }
}

fn collect_names(list: Option<&Value>, field: &str) -> Vec<String> {
    let items: Vec<&Value> = match list {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .map(clean_free_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Collapse whitespace runs and strip trailing periods
pub fn clean_free_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('.').trim_end().to_string()
}

pub(crate) fn join_or_not_specified(items: &[String]) -> String {
    if items.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_clean_free_text() {
        assert_eq!(clean_free_text("  human  embryonic\n stem cells. "), "human embryonic stem cells");
        assert_eq!(clean_free_text("H9..."), "H9");
        assert_eq!(clean_free_text("   "), "");
    }

    #[test]
    fn test_from_entry() {
        let entry = json!({
            "cellLineDetails": [{"cellLineName": "H9."}, {"cellLineName": ""}, {"cellLineName": "HUES8"}],
            "differentiationTarget": [{"targetCell": " cardiomyocytes  "}]
        });
        let info = CellLineInfo::from_entry(Some(&entry));

        assert_eq!(info.cell_lines, vec!["H9", "HUES8"]);
        assert_eq!(info.cell_lines_display(), "H9, HUES8");
        assert_eq!(info.targets_display(), "cardiomyocytes");
    }

    #[test]
    fn test_missing_entry_is_not_specified() {
        let info = CellLineInfo::from_entry(None);
        assert_eq!(info.cell_lines_display(), NOT_SPECIFIED);
        assert_eq!(info.targets_display(), NOT_SPECIFIED);
    }
}
