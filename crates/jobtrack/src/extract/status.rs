use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use regex::Regex;

use crate::config::schema::default_status_keywords;
use crate::record::Status;

/// Group evaluation order. Earlier groups win ties, so a negative outcome
/// is never masked by positive wording elsewhere in the message.
pub const STATUS_PRIORITY: [Status; 5] = [
    Status::Rejected,
    Status::Accepted,
    Status::Interview,
    Status::Withdrawn,
    Status::Applied,
];

struct StatusGroup {
    status: Status,
    keywords: Vec<String>,
    pattern: Regex,
}

/// Maps message text to the closed status vocabulary using keyword tables.
pub struct StatusClassifier {
    groups: Vec<StatusGroup>,
}

impl StatusClassifier {
    /// Builds a classifier from the built-in table with `overrides` merged
    /// on top. Entries naming an unknown status are skipped.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut table: BTreeMap<String, Status> = BTreeMap::new();
        let builtin = default_status_keywords();
        for (keyword, status) in builtin.iter().chain(overrides.iter()) {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            match status.parse::<Status>() {
                Ok(status) => {
                    table.insert(keyword, status);
                }
                Err(e) => warn!("Skipping status keyword '{}': {}", keyword, e),
            }
        }

        let groups = STATUS_PRIORITY
            .iter()
            .filter_map(|&status| {
                let keywords: Vec<String> = table
                    .iter()
                    .filter(|(_, s)| **s == status)
                    .map(|(k, _)| k.clone())
                    .collect();
                let pattern = keyword_pattern(&keywords)?;
                Some(StatusGroup {
                    status,
                    keywords,
                    pattern,
                })
            })
            .collect();

        Self { groups }
    }

    /// Every configured keyword found in `text`.
    pub fn matched_keywords(&self, text: &str) -> BTreeSet<String> {
        let mut hits = BTreeSet::new();
        for group in &self.groups {
            for m in group.pattern.find_iter(text) {
                hits.insert(normalize_phrase(m.as_str()));
            }
        }
        hits
    }

    /// The highest-priority status among `hits`, if any hit is known.
    pub fn resolve(&self, hits: &BTreeSet<String>) -> Option<Status> {
        self.groups
            .iter()
            .find(|group| group.keywords.iter().any(|k| hits.contains(k)))
            .map(|group| group.status)
    }

    pub fn classify(&self, text: &str) -> Status {
        self.groups
            .iter()
            .find(|group| group.pattern.is_match(text))
            .map(|group| group.status)
            .unwrap_or_default()
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

/// Case-insensitive, word-bounded alternation; spaces match any whitespace.
pub(crate) fn keyword_pattern(keywords: &[String]) -> Option<Regex> {
    if keywords.is_empty() {
        return None;
    }
    let mut sorted: Vec<&String> = keywords.iter().collect();
    // longest first so phrases win over their prefixes
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = sorted
        .iter()
        .map(|k| {
            k.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Invalid keyword table: {}", e);
            None
        }
    }
}

fn normalize_phrase(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
