use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NormalizeWarning, json_kind};

use super::StepId;

/// Named-attribute groups carried by a step payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeGroup {
    BasalMedia,
    Supplements,
    GrowthFactors,
    CultureMatrix,
    GeneMarkers,
}

impl AttributeGroup {
    pub const ALL: [AttributeGroup; 5] = [
        AttributeGroup::BasalMedia,
        AttributeGroup::Supplements,
        AttributeGroup::GrowthFactors,
        AttributeGroup::CultureMatrix,
        AttributeGroup::GeneMarkers,
    ];

    /// Field name inside the step payload
    pub fn payload_key(self) -> &'static str {
        match self {
            AttributeGroup::BasalMedia => "basalMedia",
            AttributeGroup::Supplements => "SerumAndSupplements",
            AttributeGroup::GrowthFactors => "growthFactor",
            AttributeGroup::CultureMatrix => "cultureMatrix",
            AttributeGroup::GeneMarkers => "geneMarkers",
        }
    }
}

impl fmt::Display for AttributeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_key())
    }
}

/// Direction reported for a gene marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneEnrichment {
    Upregulated,
    Downregulated,
    /// Field absent or null
    Unspecified,
    /// Any other value; rendered without a direction suffix
    Other(String),
}

impl GeneEnrichment {
    fn from_field(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => GeneEnrichment::Unspecified,
            Some(Value::String(s)) if s == "upregulated" => GeneEnrichment::Upregulated,
            Some(Value::String(s)) if s == "downregulated" => GeneEnrichment::Downregulated,
            Some(Value::String(s)) => GeneEnrichment::Other(s.clone()),
            Some(other) => GeneEnrichment::Other(other.to_string()),
        }
    }
}

/// One `{name, ...}` entry of an attribute group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAttribute {
    /// Trimmed name; `None` when the field was missing, null or blank
    pub name: Option<String>,
    /// Only meaningful for gene markers
    pub enrichment: GeneEnrichment,
}

/// Typed view of one step payload
///
/// Attribute groups are always ordered sequences here regardless of how
/// the submission encoded them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Raw `duration[0].durationHours` text
    pub duration_text: Option<String>,
    /// `culturingProtocol[0].isGiven`, when present as a boolean
    pub culturing_given: Option<bool>,
    pub basal_media: Vec<NamedAttribute>,
    pub supplements: Vec<NamedAttribute>,
    pub growth_factors: Vec<NamedAttribute>,
    pub culture_matrix: Vec<NamedAttribute>,
    pub gene_markers: Vec<NamedAttribute>,
}

impl StepRecord {
    /// Parse a decoded step payload, collecting shape problems as warnings
    pub fn from_payload(step: StepId, payload: &Value) -> (Self, Vec<NormalizeWarning>) {
        let mut warnings = Vec::new();
        let empty = Map::new();
        let fields = payload.as_object().unwrap_or(&empty);

        let mut record = StepRecord {
            duration_text: first_entry_field(fields, "duration", "durationHours")
                .and_then(scalar_text),
            culturing_given: first_entry_field(fields, "culturingProtocol", "isGiven")
                .and_then(given_flag),
            ..Default::default()
        };

        for group in AttributeGroup::ALL {
            let entries = parse_group(step, group, fields.get(group.payload_key()), &mut warnings);
            *record.group_mut(group) = entries;
        }

        (record, warnings)
    }

    pub fn group(&self, group: AttributeGroup) -> &[NamedAttribute] {
        match group {
            AttributeGroup::BasalMedia => &self.basal_media,
            AttributeGroup::Supplements => &self.supplements,
            AttributeGroup::GrowthFactors => &self.growth_factors,
            AttributeGroup::CultureMatrix => &self.culture_matrix,
            AttributeGroup::GeneMarkers => &self.gene_markers,
        }
    }

    fn group_mut(&mut self, group: AttributeGroup) -> &mut Vec<NamedAttribute> {
        match group {
            AttributeGroup::BasalMedia => &mut self.basal_media,
            AttributeGroup::Supplements => &mut self.supplements,
            AttributeGroup::GrowthFactors => &mut self.growth_factors,
            AttributeGroup::CultureMatrix => &mut self.culture_matrix,
            AttributeGroup::GeneMarkers => &mut self.gene_markers,
        }
    }
}

/// `isGiven` as a flag: booleans, or numbers where zero means false
pub(crate) fn given_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

/// `payload[list_key][0][field]`, tolerating an index-keyed mapping in
/// place of the list
pub(crate) fn first_entry_field<'a>(fields: &'a Map<String, Value>, list_key: &str, field: &str) -> Option<&'a Value> {
    let first = match fields.get(list_key)? {
        Value::Array(items) => items.first()?,
        Value::Object(map) => map.get("0").or_else(|| map.values().next())?,
        _ => return None,
    };
    first.get(field)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonicalize an attribute group to an ordered list of entries
///
/// Index-keyed mappings are ordered by numeric key; non-numeric keys keep
/// their map order after the numeric ones.
fn parse_group(
    step: StepId,
    group: AttributeGroup,
    value: Option<&Value>,
    warnings: &mut Vec<NormalizeWarning>,
) -> Vec<NamedAttribute> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => {
            let mut keyed: Vec<(Option<u64>, &Value)> = map
                .iter()
                .map(|(k, v)| (k.trim().parse::<u64>().ok(), v))
                .collect();
            keyed.sort_by_key(|(index, _)| (index.is_none(), *index));
            keyed.into_iter().map(|(_, v)| v).collect()
        }
        Some(other) => {
            warnings.push(NormalizeWarning::MalformedAttributeGroup {
                step,
                group,
                detail: format!("expected a list or mapping, found {}", json_kind(other)),
            });
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let Some(fields) = item.as_object() else {
            if !item.is_null() {
                warnings.push(NormalizeWarning::MalformedAttributeGroup {
                    step,
                    group,
                    detail: format!("entry {} is a {}, not an object", position, json_kind(item)),
                });
            }
            continue;
        };

        let name = match fields.get("name") {
            Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            None | Some(Value::Null) => None,
            Some(other) => {
                warnings.push(NormalizeWarning::MalformedAttributeGroup {
                    step,
                    group,
                    detail: format!("entry {} has a {} name", position, json_kind(other)),
                });
                None
            }
        };

        entries.push(NamedAttribute {
            name,
            enrichment: GeneEnrichment::from_field(fields.get("geneEnrichment")),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_list_and_mapping_groups_alike() {
        let as_list = json!({
            "basalMedia": [{"name": "DMEM"}, {"name": "F12"}]
        });
        let as_map = json!({
            "basalMedia": {"1": {"name": "F12"}, "0": {"name": "DMEM"}}
        });

        let (list_record, list_warnings) = StepRecord::from_payload(1, &as_list);
        let (map_record, map_warnings) = StepRecord::from_payload(1, &as_map);

        assert!(list_warnings.is_empty());
        assert!(map_warnings.is_empty());
        assert_eq!(list_record.basal_media, map_record.basal_media);
        assert_eq!(map_record.basal_media[0].name.as_deref(), Some("DMEM"));
    }

    #[test]
    fn test_mapping_orders_by_numeric_key() {
        let payload = json!({
            "growthFactor": {"10": {"name": "BMP4"}, "2": {"name": "FGF2"}}
        });
        let (record, _) = StepRecord::from_payload(3, &payload);
        let names: Vec<_> = record
            .growth_factors
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect();

        assert_eq!(names, vec!["FGF2", "BMP4"]);
    }

    #[test]
    fn test_duration_and_culturing_fields() {
        let payload = json!({
            "duration": [{"durationHours": "2 weeks"}],
            "culturingProtocol": [{"isGiven": false}]
        });
        let (record, _) = StepRecord::from_payload(0, &payload);

        assert_eq!(record.duration_text.as_deref(), Some("2 weeks"));
        assert_eq!(record.culturing_given, Some(false));

        let numeric = json!({"duration": [{"durationHours": 48}]});
        let (record, _) = StepRecord::from_payload(1, &numeric);
        assert_eq!(record.duration_text.as_deref(), Some("48"));
    }

    #[test]
    fn test_malformed_group_is_skipped_with_warning() {
        let payload = json!({
            "basalMedia": "DMEM",
            "growthFactor": [{"name": "FGF2"}, "Activin A", {"name": 7}]
        });
        let (record, warnings) = StepRecord::from_payload(2, &payload);

        assert!(record.basal_media.is_empty());
        assert_eq!(record.growth_factors.len(), 2);
        assert_eq!(record.growth_factors[1].name, None);
        assert_eq!(warnings.len(), 3);
        assert!(matches!(
            warnings[0],
            NormalizeWarning::MalformedAttributeGroup {
                group: AttributeGroup::BasalMedia,
                ..
            }
        ));
    }

    #[test]
    fn test_gene_enrichment_variants() {
        let payload = json!({
            "geneMarkers": [
                {"name": "SOX2", "geneEnrichment": "upregulated"},
                {"name": "OCT4", "geneEnrichment": "downregulated"},
                {"name": "PAX6", "geneEnrichment": null},
                {"name": "NES"},
                {"name": "MAP2", "geneEnrichment": "unchanged"}
            ]
        });
        let (record, _) = StepRecord::from_payload(1, &payload);
        let directions: Vec<_> = record.gene_markers.iter().map(|m| m.enrichment.clone()).collect();

        assert_eq!(
            directions,
            vec![
                GeneEnrichment::Upregulated,
                GeneEnrichment::Downregulated,
                GeneEnrichment::Unspecified,
                GeneEnrichment::Unspecified,
                GeneEnrichment::Other("unchanged".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_object_payload_yields_empty_record() {
        let (record, warnings) = StepRecord::from_payload(4, &json!(null));
        assert_eq!(record, StepRecord::default());
        assert!(warnings.is_empty());
    }
}
