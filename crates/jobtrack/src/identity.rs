//! Deterministic record ids.
//!
//! An id reads `company_position[_keyword]_hash`. The readable prefix is
//! truncated; the hash covers the full company, position and source
//! message id, so two messages never share an id while the same message
//! always maps to the same one.

use sha2::{Digest, Sha256};

use crate::config::IdentityConfig;

const HASH_SEPARATOR: &str = "\u{1f}";
const EMPTY_PART: &str = "unknown";

#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    config: IdentityConfig,
}

impl IdentityGenerator {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    pub fn generate(
        &self,
        company: &str,
        position: &str,
        keyword: &str,
        source_message_id: &str,
    ) -> String {
        let mut parts = vec![
            prefix(company, self.config.company_prefix_len),
            prefix(position, self.config.position_prefix_len),
        ];
        let keyword = normalize(keyword);
        if !keyword.is_empty() {
            parts.push(keyword.chars().take(self.config.keyword_prefix_len).collect());
        }
        parts.push(self.hash(company, position, source_message_id));
        parts.join("_")
    }

    fn hash(&self, company: &str, position: &str, source_message_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(company.as_bytes());
        hasher.update(HASH_SEPARATOR.as_bytes());
        hasher.update(position.as_bytes());
        hasher.update(HASH_SEPARATOR.as_bytes());
        hasher.update(source_message_id.as_bytes());
        let digest = hasher.finalize();

        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex.chars().take(self.config.hash_len).collect()
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new(IdentityConfig::default())
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn prefix(text: &str, len: usize) -> String {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return EMPTY_PART.to_string();
    }
    normalized.chars().take(len).collect()
}
