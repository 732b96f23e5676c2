//! Field extraction: company, position, status keywords and the
//! disambiguation keyword used for ids.

pub mod keywords;
pub mod pattern;
pub mod status;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::email::{DecodedContent, RawMessage};
use crate::record::Status;

pub use keywords::PositionKeyExtractor;
pub use pattern::PatternExtractor;
pub use status::StatusClassifier;

/// Fields derived from one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    /// Empty when no company could be detected.
    pub company: String,
    /// Best-effort title; empty when none matched.
    pub position: String,
    /// Status keywords found in subject and body.
    pub status_hits: BTreeSet<String>,
    /// Status suggested by the extractor itself. Only used when there
    /// are no keyword hits.
    pub status_hint: Option<Status>,
    pub confidence: Option<f32>,
    /// Extra `(label, value)` pairs appended to the record notes.
    pub attributes: Vec<(String, String)>,
    pub extractor_notes: Option<String>,
    /// Record `source` value, e.g. `Email (Pattern)`.
    pub source: String,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Extractor unavailable: {0}")]
    Unavailable(String),

    #[error("Extractor failed: {0}")]
    Failed(String),
}

/// Derives [`ExtractedFields`] from a decoded message.
///
/// The pattern extractor never fails; other implementations may, and the
/// pipeline then falls back to pattern matching.
pub trait FieldExtractor {
    fn name(&self) -> &'static str;

    /// `content` is the decoded form of `message`.
    fn extract(
        &self,
        message: &RawMessage,
        content: &DecodedContent,
    ) -> Result<ExtractedFields, ExtractError>;
}

/// Capitalizes each word, keeping all-caps acronyms such as `QA` or `IBM`.
pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            word.split('-')
                .map(title_case_word)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Lower-case alphanumerics only; the key used to compare companies.
pub fn company_key(company: &str) -> String {
    company
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
