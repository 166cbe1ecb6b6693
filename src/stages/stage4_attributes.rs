use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{AttributeGroup, GeneEnrichment, NOT_SPECIFIED, NamedAttribute, StepRecord};

/// Configuration for Stage 4 attribute extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeConfig {
    /// Names treated as "no value" per group
    pub placeholders: BTreeMap<AttributeGroup, Vec<String>>,
}

impl Default for AttributeConfig {
    fn default() -> Self {
        let placeholders = AttributeGroup::ALL
            .into_iter()
            .map(|group| {
                let names: &[&str] = match group {
                    AttributeGroup::BasalMedia
                    | AttributeGroup::Supplements
                    | AttributeGroup::GrowthFactors => &["-", "NA"],
                    AttributeGroup::CultureMatrix | AttributeGroup::GeneMarkers => {
                        &["-", "NA", "Not given"]
                    }
                };
                (group, names.iter().map(|s| s.to_string()).collect())
            })
            .collect();

        Self { placeholders }
    }
}

impl AttributeConfig {
    pub fn placeholders_for(&self, group: AttributeGroup) -> &[String] {
        self.placeholders.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Display names extracted from one attribute group of one step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeList {
    pub names: Vec<String>,
}

impl AttributeList {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names joined with `", "`, or "Not specified"
    pub fn display(&self) -> String {
        if self.names.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            self.names.join(", ")
        }
    }
}

/// Per-step attribute lists, one per group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAttributes {
    pub basal_media: AttributeList,
    pub supplements: AttributeList,
    pub growth_factors: AttributeList,
    pub culture_matrix: AttributeList,
    /// Absent for the culturing step, which has no readout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gene_markers: Option<AttributeList>,
}

fn is_placeholder(name: &str, placeholders: &[String]) -> bool {
    placeholders.iter().any(|p| p == name)
}

/// Names of the entries that carry a real value, in entry order
pub fn extract_names(entries: &[NamedAttribute], placeholders: &[String]) -> AttributeList {
    let names = entries
        .iter()
        .filter_map(|entry| entry.name.as_deref())
        .filter(|name| !is_placeholder(name, placeholders))
        .map(str::to_string)
        .collect();

    AttributeList { names }
}

/// Like [`extract_names`], with a direction glyph from `geneEnrichment`
pub fn extract_markers(entries: &[NamedAttribute], placeholders: &[String]) -> AttributeList {
    let names = entries
        .iter()
        .filter_map(|entry| entry.name.as_deref().map(|name| (name, &entry.enrichment)))
        .filter(|(name, _)| !is_placeholder(name, placeholders))
        .map(|(name, enrichment)| match enrichment {
            GeneEnrichment::Upregulated => format!("{} ↑", name),
            GeneEnrichment::Downregulated => format!("{} ↓", name),
            GeneEnrichment::Unspecified => format!("{} (direction not specified)", name),
            GeneEnrichment::Other(_) => name.to_string(),
        })
        .collect();

    AttributeList { names }
}

/// Perform Stage 4 for one step
pub fn extract_step_attributes(
    record: &StepRecord,
    include_markers: bool,
    config: &AttributeConfig,
) -> StepAttributes {
    let list = |group: AttributeGroup| extract_names(record.group(group), config.placeholders_for(group));

    StepAttributes {
        basal_media: list(AttributeGroup::BasalMedia),
        supplements: list(AttributeGroup::Supplements),
        growth_factors: list(AttributeGroup::GrowthFactors),
        culture_matrix: list(AttributeGroup::CultureMatrix),
        gene_markers: include_markers.then(|| {
            extract_markers(
                record.group(AttributeGroup::GeneMarkers),
                config.placeholders_for(AttributeGroup::GeneMarkers),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(payload: serde_json::Value) -> StepRecord {
        StepRecord::from_payload(1, &payload).0
    }

    #[test]
    fn test_media_placeholders_filtered() {
        let step = record(json!({
            "basalMedia": [{"name": "DMEM"}, {"name": "-"}, {"name": "F12"}]
        }));
        let config = AttributeConfig::default();
        let media = extract_names(&step.basal_media, config.placeholders_for(AttributeGroup::BasalMedia));

        assert_eq!(media.display(), "DMEM, F12");
    }

    #[test]
    fn test_all_placeholders_is_not_specified() {
        let step = record(json!({
            "SerumAndSupplements": [{"name": "-"}, {"name": "NA"}, {"name": null}]
        }));
        let attributes = extract_step_attributes(&step, true, &AttributeConfig::default());

        assert!(attributes.supplements.is_empty());
        assert_eq!(attributes.supplements.display(), NOT_SPECIFIED);
    }

    #[test]
    fn test_matrix_excludes_not_given() {
        let step = record(json!({
            "cultureMatrix": {"0": {"name": "Not given"}, "1": {"name": "Matrigel"}}
        }));
        let attributes = extract_step_attributes(&step, true, &AttributeConfig::default());

        assert_eq!(attributes.culture_matrix.display(), "Matrigel");
    }

    #[test]
    fn test_marker_directions() {
        let step = record(json!({
            "geneMarkers": [
                {"name": "SOX2", "geneEnrichment": "upregulated"},
                {"name": "OCT4", "geneEnrichment": "downregulated"},
                {"name": "PAX6", "geneEnrichment": null},
                {"name": "NES"},
                {"name": "Not given", "geneEnrichment": "upregulated"}
            ]
        }));
        let attributes = extract_step_attributes(&step, true, &AttributeConfig::default());
        let markers = attributes.gene_markers.unwrap();

        assert_eq!(
            markers.names,
            vec![
                "SOX2 ↑",
                "OCT4 ↓",
                "PAX6 (direction not specified)",
                "NES (direction not specified)",
            ]
        );
    }

    #[test]
    fn test_markers_skipped_when_not_requested() {
        let step = record(json!({"geneMarkers": [{"name": "SOX2"}]}));
        let attributes = extract_step_attributes(&step, false, &AttributeConfig::default());
        assert_eq!(attributes.gene_markers, None);
    }

    #[test]
    fn test_custom_placeholders() {
        let mut config = AttributeConfig::default();
        config
            .placeholders
            .insert(AttributeGroup::GrowthFactors, vec!["none".to_string()]);
        let step = record(json!({"growthFactor": [{"name": "none"}, {"name": "-"}]}));

        let attributes = extract_step_attributes(&step, false, &config);
        assert_eq!(attributes.growth_factors.names, vec!["-"]);
    }
}
