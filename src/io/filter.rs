use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{SubmissionRecord, normalize_id};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digits pattern"));

/// Blacklist file contents
///
/// `participants` maps a participant id to either `"all"` or a free-text
/// list of publication ids to drop for that participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Blacklist {
    pub participants: BTreeMap<String, String>,
    pub publications: Vec<String>,
}

impl Blacklist {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read blacklist: {:?}", path))?;
        serde_json::from_str(&content).context("Failed to parse blacklist JSON")
    }
}

/// Which submissions reach the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Only rows with exactly this status are kept
    pub accepted_status: String,
    pub excluded_participants: BTreeSet<String>,
    pub excluded_publications: BTreeSet<String>,
    /// (participant id, publication id) pairs
    pub excluded_pairs: BTreeSet<(String, String)>,
    /// Keep only this publication, if set
    pub publication: Option<String>,
    /// Keep only this participant, if set
    pub participant: Option<String>,
    /// Cap on the number of records kept
    pub limit: Option<usize>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            accepted_status: "submitted".to_string(),
            excluded_participants: BTreeSet::new(),
            excluded_publications: BTreeSet::new(),
            excluded_pairs: BTreeSet::new(),
            publication: None,
            participant: None,
            limit: None,
        }
    }
}

impl FilterConfig {
    /// Merge blacklist entries into the exclusion sets
    pub fn with_blacklist(mut self, blacklist: &Blacklist) -> Self {
        for (participant, submissions) in &blacklist.participants {
            let participant = normalize_id(participant);
            let submissions = submissions.trim();
            if participant.is_empty() || submissions.is_empty() {
                continue;
            }
            if submissions.eq_ignore_ascii_case("all") {
                self.excluded_participants.insert(participant);
            } else {
                for pmid in DIGITS.find_iter(submissions) {
                    self.excluded_pairs
                        .insert((participant.clone(), pmid.as_str().to_string()));
                }
            }
        }

        self.excluded_publications.extend(
            blacklist
                .publications
                .iter()
                .map(|p| normalize_id(p))
                .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())),
        );

        self
    }

    pub fn accepts(&self, record: &SubmissionRecord) -> bool {
        record.status == self.accepted_status
            && !self.excluded_participants.contains(&record.participant_id)
            && !self.excluded_publications.contains(&record.publication_id)
            && !self
                .excluded_pairs
                .contains(&(record.participant_id.clone(), record.publication_id.clone()))
            && self
                .publication
                .as_ref()
                .is_none_or(|p| *p == record.publication_id)
            && self
                .participant
                .as_ref()
                .is_none_or(|p| *p == record.participant_id)
    }
}

/// Keep the records the filter accepts, in order
pub fn filter_submissions(records: Vec<SubmissionRecord>, config: &FilterConfig) -> Vec<SubmissionRecord> {
    let total = records.len();
    let kept: Vec<SubmissionRecord> = records
        .into_iter()
        .filter(|r| config.accepts(r))
        .take(config.limit.unwrap_or(usize::MAX))
        .collect();

    info!("Kept {} of {} submissions after filtering", kept.len(), total);
    kept
}
