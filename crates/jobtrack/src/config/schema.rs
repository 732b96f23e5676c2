use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Mailbox label holding unprocessed job mail.
    #[serde(default = "default_mailbox_label")]
    pub mailbox_label: String,
    #[serde(default = "default_processed_label")]
    pub processed_label: String,
    /// Name of the primary destination (the tracker table).
    #[serde(default = "default_destination_name")]
    pub destination_name: String,
    /// SQLite database path. Defaults to `~/.jobtrack/data/jobtrack.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_fallback_csv_path")]
    pub fallback_csv_path: String,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_mailbox_label() -> String {
    "Job Applications".to_string()
}

fn default_processed_label() -> String {
    "Job Applications/Processed".to_string()
}

fn default_destination_name() -> String {
    "Job Applications Tracker".to_string()
}

fn default_fallback_csv_path() -> String {
    "job_applications_fallback.csv".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            mailbox_label: default_mailbox_label(),
            processed_label: default_processed_label(),
            destination_name: default_destination_name(),
            database_path: None,
            fallback_csv_path: default_fallback_csv_path(),
            keywords: KeywordsConfig::default(),
            identity: IdentityConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

/// Keyword tables driving extraction and classification.
///
/// An empty list falls back to the built-in table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Keyword or phrase -> status name. Merged over the built-in map.
    #[serde(default = "default_status_keywords")]
    pub status: BTreeMap<String, String>,
    /// Priority-ordered disambiguation keywords.
    #[serde(default = "default_position_disambiguation")]
    pub position_disambiguation: Vec<String>,
    /// Sender domains that never name the employer.
    #[serde(default = "default_ignored_sender_domains")]
    pub ignored_sender_domains: Vec<String>,
    /// Subject words that precede a company name, in lookup order.
    #[serde(default = "default_company_indicators")]
    pub company_indicators: Vec<String>,
    #[serde(default = "default_title_keywords")]
    pub title_keywords: Vec<String>,
    #[serde(default = "default_title_qualifiers")]
    pub title_qualifiers: Vec<String>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            status: default_status_keywords(),
            position_disambiguation: default_position_disambiguation(),
            ignored_sender_domains: default_ignored_sender_domains(),
            company_indicators: default_company_indicators(),
            title_keywords: default_title_keywords(),
            title_qualifiers: default_title_qualifiers(),
        }
    }
}

impl KeywordsConfig {
    pub fn position_disambiguation_or_default(&self) -> Vec<String> {
        non_empty_or(&self.position_disambiguation, default_position_disambiguation)
    }

    pub fn ignored_sender_domains_or_default(&self) -> Vec<String> {
        non_empty_or(&self.ignored_sender_domains, default_ignored_sender_domains)
    }

    pub fn company_indicators_or_default(&self) -> Vec<String> {
        non_empty_or(&self.company_indicators, default_company_indicators)
    }

    pub fn title_keywords_or_default(&self) -> Vec<String> {
        non_empty_or(&self.title_keywords, default_title_keywords)
    }

    pub fn title_qualifiers_or_default(&self) -> Vec<String> {
        non_empty_or(&self.title_qualifiers, default_title_qualifiers)
    }
}

fn non_empty_or(values: &[String], fallback: fn() -> Vec<String>) -> Vec<String> {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        fallback()
    } else {
        cleaned
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn default_status_keywords() -> BTreeMap<String, String> {
    let groups: [(&str, &[&str]); 5] = [
        (
            "Rejected",
            &[
                "unfortunately",
                "regret",
                "not moving forward",
                "not selected",
                "rejected",
                "other candidates",
            ],
        ),
        (
            "Accepted",
            &["congratulations", "offer", "welcome", "accepted", "pleased to offer"],
        ),
        (
            "Interview",
            &["interview", "schedule a call", "next steps", "phone screen"],
        ),
        ("Withdrawn", &["withdrawn", "cancelled", "no longer interested"]),
        (
            "Applied",
            &[
                "thank you for applying",
                "application received",
                "received your application",
            ],
        ),
    ];

    groups
        .iter()
        .flat_map(|(status, keywords)| {
            keywords
                .iter()
                .map(move |k| (k.to_string(), status.to_string()))
        })
        .collect()
}

pub fn default_position_disambiguation() -> Vec<String> {
    strings(&[
        "backend",
        "frontend",
        "fullstack",
        "full-stack",
        "full stack",
        "machine learning",
        "ml",
        "ai",
        "data",
        "infrastructure",
        "mobile",
        "ios",
        "android",
        "web",
        "cloud",
        "devops",
        "security",
        "embedded",
        "systems",
        "platform",
        "api",
        "senior",
        "junior",
        "lead",
        "principal",
        "staff",
        "remote",
        "onsite",
        "hybrid",
        "contract",
        "intern",
    ])
}

pub fn default_ignored_sender_domains() -> Vec<String> {
    strings(&[
        "gmail",
        "googlemail",
        "yahoo",
        "hotmail",
        "outlook",
        "live",
        "aol",
        "icloud",
        "me",
        "protonmail",
        "proton",
        "gmx",
        "linkedin",
        "greenhouse",
        "greenhouse-mail",
        "lever",
        "workday",
        "myworkday",
        "myworkdayjobs",
        "indeed",
        "indeedemail",
        "glassdoor",
        "smartrecruiters",
        "icims",
        "taleo",
        "jobvite",
        "ashbyhq",
        "bamboohr",
        "workable",
        "ziprecruiter",
        "successfactors",
    ])
}

pub fn default_company_indicators() -> Vec<String> {
    strings(&["at", "with", "from", "via", "to", "for"])
}

pub fn default_title_keywords() -> Vec<String> {
    strings(&[
        "engineer",
        "developer",
        "programmer",
        "scientist",
        "analyst",
        "manager",
        "director",
        "architect",
        "consultant",
        "designer",
        "intern",
        "internship",
        "administrator",
        "specialist",
        "researcher",
        "coordinator",
        "associate",
        "technician",
        "lead",
    ])
}

pub fn default_title_qualifiers() -> Vec<String> {
    strings(&[
        "senior",
        "junior",
        "sr",
        "jr",
        "lead",
        "principal",
        "staff",
        "chief",
        "head",
        "software",
        "backend",
        "back-end",
        "frontend",
        "front-end",
        "fullstack",
        "full-stack",
        "full",
        "stack",
        "data",
        "machine",
        "learning",
        "ml",
        "ai",
        "cloud",
        "devops",
        "security",
        "embedded",
        "systems",
        "platform",
        "product",
        "project",
        "program",
        "business",
        "research",
        "mobile",
        "ios",
        "android",
        "web",
        "qa",
        "test",
        "site",
        "reliability",
        "infrastructure",
        "network",
        "graduate",
        "summer",
        "technical",
        "ux",
        "ui",
        "marketing",
        "sales",
        "financial",
    ])
}

/// Shape of generated record ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_company_prefix_len")]
    pub company_prefix_len: usize,
    #[serde(default = "default_position_prefix_len")]
    pub position_prefix_len: usize,
    #[serde(default = "default_keyword_prefix_len")]
    pub keyword_prefix_len: usize,
    #[serde(default = "default_hash_len")]
    pub hash_len: usize,
}

fn default_company_prefix_len() -> usize {
    10
}

fn default_position_prefix_len() -> usize {
    15
}

fn default_keyword_prefix_len() -> usize {
    10
}

fn default_hash_len() -> usize {
    8
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            company_prefix_len: default_company_prefix_len(),
            position_prefix_len: default_position_prefix_len(),
            keyword_prefix_len: default_keyword_prefix_len(),
            hash_len: default_hash_len(),
        }
    }
}

/// AI-assisted extraction configuration.
///
/// The API key is resolved in order: `api_key` (direct), `api_key_file`,
/// then the `api_key_env` environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_body_chars() -> usize {
    4000
}

fn default_ai_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_ai_model(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            max_body_chars: default_max_body_chars(),
            endpoint: default_ai_endpoint(),
        }
    }
}
