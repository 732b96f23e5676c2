use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::KeywordsConfig;
use crate::email::{DecodedContent, RawMessage};

use super::status::StatusClassifier;
use super::{title_case, ExtractError, ExtractedFields, FieldExtractor};

pub const PATTERN_SOURCE: &str = "Email (Pattern)";

static RE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9+#&'-]*").unwrap());

/// Second-level labels dropped after the TLD (`co.uk`, `com.au`, ...).
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

/// Leading host labels that name a mail system, not the employer.
const HOST_PREFIXES: &[&str] = &[
    "mail",
    "email",
    "e",
    "mx",
    "smtp",
    "careers",
    "career",
    "jobs",
    "job",
    "hr",
    "talent",
    "recruiting",
    "recruitment",
    "notifications",
    "notification",
    "notify",
    "no-reply",
    "noreply",
    "info",
    "news",
    "www",
];

const SKIPPED_BEFORE_COMPANY: &[&str] = &["the", "a", "an", "our", "your", "my"];

/// Keyword-table extractor. Pure, local and infallible.
pub struct PatternExtractor {
    classifier: Arc<StatusClassifier>,
    ignored_domains: HashSet<String>,
    company_indicators: Vec<String>,
    title_keywords: HashSet<String>,
    title_qualifiers: HashSet<String>,
}

impl PatternExtractor {
    pub fn new(keywords: &KeywordsConfig, classifier: Arc<StatusClassifier>) -> Self {
        Self {
            classifier,
            ignored_domains: keywords
                .ignored_sender_domains_or_default()
                .into_iter()
                .collect(),
            company_indicators: keywords.company_indicators_or_default(),
            title_keywords: keywords.title_keywords_or_default().into_iter().collect(),
            title_qualifiers: keywords.title_qualifiers_or_default().into_iter().collect(),
        }
    }

    pub fn extract_fields(&self, content: &DecodedContent, sender: &str) -> ExtractedFields {
        let company = self
            .company_from_sender(sender)
            .or_else(|| self.company_from_subject(&content.subject))
            .unwrap_or_default();
        let position = self
            .position_in(&content.subject)
            .or_else(|| self.position_in(&content.body))
            .unwrap_or_default();

        ExtractedFields {
            company,
            position,
            status_hits: self.classifier.matched_keywords(&content.full_text()),
            source: PATTERN_SOURCE.to_string(),
            ..Default::default()
        }
    }

    /// Employer name from the sender domain, if the domain is not a
    /// personal mail provider or job-board relay.
    pub fn company_from_sender(&self, sender: &str) -> Option<String> {
        let address = sender_address(sender);
        let (_, domain) = address.rsplit_once('@')?;
        let mut labels: Vec<String> = domain
            .trim()
            .trim_end_matches('.')
            .split('.')
            .filter(|l| !l.is_empty())
            .map(str::to_lowercase)
            .collect();

        if labels.len() > 1 {
            labels.pop();
        }
        while labels.len() > 1
            && labels
                .last()
                .is_some_and(|l| SECOND_LEVEL_LABELS.contains(&l.as_str()))
        {
            labels.pop();
        }
        while labels.len() > 1 && HOST_PREFIXES.contains(&labels[0].as_str()) {
            labels.remove(0);
        }

        let label = labels.pop()?;
        if self.ignored_domains.contains(&label) || HOST_PREFIXES.contains(&label.as_str()) {
            return None;
        }
        Some(title_case(&label.replace(['-', '_'], " ")))
    }

    /// Capitalized token after a company indicator word in the subject.
    pub fn company_from_subject(&self, subject: &str) -> Option<String> {
        let tokens: Vec<&str> = subject
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .collect();

        for indicator in &self.company_indicators {
            for (i, token) in tokens.iter().enumerate() {
                if !token.eq_ignore_ascii_case(indicator) {
                    continue;
                }
                let candidate = tokens[i + 1..]
                    .iter()
                    .find(|t| !SKIPPED_BEFORE_COMPANY.contains(&t.to_lowercase().as_str()));
                if let Some(candidate) = candidate {
                    let name = strip_possessive(candidate);
                    if name.chars().next().is_some_and(char::is_uppercase) {
                        return Some(title_case(name));
                    }
                }
            }
        }
        None
    }

    /// Longest contiguous run of qualifier/title words that contains and
    /// ends on a title keyword. The first run wins ties.
    pub fn position_in(&self, text: &str) -> Option<String> {
        let mut best: Option<Vec<&str>> = None;
        let mut run: Vec<&str> = Vec::new();
        let mut previous_end = 0;

        for m in RE_WORD.find_iter(text) {
            let word = m.as_str().trim_end_matches(['-', '\'']);
            let gap = &text[previous_end..m.start()];
            let contiguous = !run.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t');
            previous_end = m.end();

            if !contiguous {
                self.close_run(&mut run, &mut best);
            }
            if self.is_title_word(word) || self.is_qualifier(word) {
                run.push(word);
            } else {
                self.close_run(&mut run, &mut best);
            }
        }
        self.close_run(&mut run, &mut best);

        best.map(|words| title_case(&words.join(" ")))
    }

    fn close_run<'a>(&self, run: &mut Vec<&'a str>, best: &mut Option<Vec<&'a str>>) {
        if let Some(last_title) = run.iter().rposition(|w| self.is_title_word(w)) {
            let candidate = &run[..=last_title];
            if best.as_ref().map_or(true, |b| candidate.len() > b.len()) {
                *best = Some(candidate.to_vec());
            }
        }
        run.clear();
    }

    fn is_title_word(&self, word: &str) -> bool {
        self.title_keywords.contains(&word.to_lowercase())
    }

    fn is_qualifier(&self, word: &str) -> bool {
        self.title_qualifiers.contains(&word.to_lowercase())
    }
}

impl FieldExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(
        &self,
        message: &RawMessage,
        content: &DecodedContent,
    ) -> Result<ExtractedFields, ExtractError> {
        Ok(self.extract_fields(content, &message.sender))
    }
}

/// The address part of `Name <addr@host>` or a bare address.
pub fn sender_address(sender: &str) -> &str {
    match (sender.rfind('<'), sender.rfind('>')) {
        (Some(start), Some(end)) if start < end => sender[start + 1..end].trim(),
        _ => sender.trim(),
    }
}

fn strip_possessive(token: &str) -> &str {
    token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("’s"))
        .unwrap_or(token)
}
