use regex::Regex;

use crate::record::UNKNOWN_POSITION;

use super::status::keyword_pattern;

/// Picks a short keyword that tells apart applications to one company.
pub struct PositionKeyExtractor {
    /// One word-bounded matcher per keyword, in priority order.
    keywords: Vec<(String, Regex)>,
}

impl PositionKeyExtractor {
    pub fn new(keywords: &[String]) -> Self {
        let keywords = keywords
            .iter()
            .filter_map(|k| {
                let k = k.trim().to_lowercase();
                let pattern = keyword_pattern(std::slice::from_ref(&k))?;
                Some((k, pattern))
            })
            .collect();
        Self { keywords }
    }

    /// First priority keyword present in `subject`, else the first
    /// alphanumeric token of `position`, else an empty string.
    pub fn extract(&self, subject: &str, position: &str) -> String {
        if let Some((keyword, _)) = self.keywords.iter().find(|(_, re)| re.is_match(subject)) {
            return keyword.clone();
        }

        if position.is_empty() || position == UNKNOWN_POSITION {
            return String::new();
        }
        position
            .split(|c: char| !c.is_alphanumeric())
            .find(|t| !t.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_default()
    }
}
