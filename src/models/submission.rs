use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row from the submission table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(deserialize_with = "id_string")]
    pub participant_id: String,
    #[serde(deserialize_with = "id_string")]
    pub publication_id: String,
    #[serde(default)]
    pub status: String,
    /// JSON text or an already-decoded object
    #[serde(default)]
    pub merged_data: Value,
}

impl SubmissionRecord {
    pub fn new(participant_id: &str, publication_id: &str, merged_data: Value) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            publication_id: publication_id.to_string(),
            status: "submitted".to_string(),
            merged_data,
        }
    }
}

/// Normalize an identifier: trimmed, with float-encoded integers
/// (`"1234.0"`) reduced to their integer form
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(".0") {
        Some(int_part) if !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit()) => {
            int_part.to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Accept ids as JSON strings or numbers
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => normalize_id(&s),
        Value::Number(n) => normalize_id(&n.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id(" 35123456 "), "35123456");
        assert_eq!(normalize_id("35123456.0"), "35123456");
        assert_eq!(normalize_id("v1.0"), "v1.0");
    }

    #[test]
    fn test_deserialize_numeric_ids() {
        let json = r#"{"participant_id": 753972611481993256, "publication_id": "35123456.0",
                       "status": "submitted", "merged_data": "{}"}"#;
        let record: SubmissionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.participant_id, "753972611481993256");
        assert_eq!(record.publication_id, "35123456");
        assert_eq!(record.merged_data, Value::String("{}".to_string()));
    }
}
