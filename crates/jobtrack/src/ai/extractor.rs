use log::{debug, warn};
use serde_json::Value;

use crate::email::{DecodedContent, RawMessage};
use crate::extract::{ExtractError, ExtractedFields, FieldExtractor, PatternExtractor};
use crate::record::Status;

use super::{AiError, CompletionBackend};

pub const AI_SOURCE: &str = "Email (AI)";

/// Response keys copied into the record notes, with their labels.
const ATTRIBUTES: &[(&str, &str)] = &[
    ("location", "Location"),
    ("job_type", "Job Type"),
    ("experience_level", "Experience Level"),
    ("department", "Department"),
    ("salary_range", "Salary Range"),
];

const PROMPT_TEMPLATE: &str = r#"You extract job application details from emails.

EMAIL:
From: {sender}
Subject: {subject}
Date: {date}
Body: {body}

Reply with a single JSON object and nothing else:
{
  "company": "employer name, from the sender domain, subject or body",
  "position": "specific job title",
  "status": "one of Applied, Interview, Rejected, Accepted, Withdrawn, Offer",
  "application_date": "YYYY-MM-DD or null",
  "location": "city, country or remote, or null",
  "salary_range": "salary range if mentioned, or null",
  "job_type": "full-time, part-time, contract, intern or freelance, or null",
  "experience_level": "entry, junior, mid, senior, lead or principal, or null",
  "department": "team or department, or null",
  "confidence_score": 0.0,
  "extraction_notes": "short notes on uncertain fields"
}

Use null for anything the email does not state. If several positions are
mentioned, describe the primary one."#;

/// Asks a language model for the record fields.
///
/// Company and position the model leaves out are filled in by pattern
/// matching. Status keywords are always taken from pattern matching so a
/// keyword hit outranks the model's status.
pub struct AiExtractor<B> {
    backend: B,
    pattern: PatternExtractor,
    max_body_chars: usize,
}

impl<B: CompletionBackend> AiExtractor<B> {
    pub fn new(backend: B, pattern: PatternExtractor, max_body_chars: usize) -> Self {
        Self {
            backend,
            pattern,
            max_body_chars,
        }
    }

    fn prompt(&self, message: &RawMessage, content: &DecodedContent) -> String {
        let body: String = content.body.chars().take(self.max_body_chars).collect();
        PROMPT_TEMPLATE
            .replace("{sender}", &message.sender)
            .replace("{subject}", &content.subject)
            .replace("{date}", &message.received_at.to_rfc3339())
            .replace("{body}", &body)
    }

    fn fields_from_reply(
        &self,
        reply: &str,
        message: &RawMessage,
        content: &DecodedContent,
    ) -> Result<ExtractedFields, AiError> {
        let json = first_json_object(reply).ok_or(AiError::NoJson)?;
        let value: Value = serde_json::from_str(json)?;

        let pattern = self.pattern.extract_fields(content, &message.sender);
        let mut notes = text_field(&value, "extraction_notes");

        let company = match text_field(&value, "company") {
            Some(company) => company,
            None => {
                append_note(&mut notes, "Company extracted via fallback");
                pattern.company
            }
        };
        let position = match text_field(&value, "position") {
            Some(position) => position,
            None => {
                append_note(&mut notes, "Position extracted via fallback");
                pattern.position
            }
        };

        let status_hint = text_field(&value, "status").and_then(|s| match s.parse::<Status>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Ignoring model status: {}", e);
                None
            }
        });

        let attributes = ATTRIBUTES
            .iter()
            .filter_map(|(key, label)| {
                text_field(&value, key).map(|v| (label.to_string(), v))
            })
            .collect();

        Ok(ExtractedFields {
            company,
            position,
            status_hits: pattern.status_hits,
            status_hint,
            confidence: confidence(&value),
            attributes,
            extractor_notes: notes,
            source: AI_SOURCE.to_string(),
        })
    }
}

impl<B: CompletionBackend> FieldExtractor for AiExtractor<B> {
    fn name(&self) -> &'static str {
        "ai"
    }

    fn extract(
        &self,
        message: &RawMessage,
        content: &DecodedContent,
    ) -> Result<ExtractedFields, ExtractError> {
        let reply = self.backend.complete(&self.prompt(message, content))?;
        debug!("Model replied with {} chars", reply.len());
        Ok(self.fields_from_reply(&reply, message, content)?)
    }
}

/// The first balanced `{...}` in `text`, ignoring braces inside strings.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// A string field, or `None` for missing, `null`, empty or `"null"`.
fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.to_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(text),
    }
}

fn confidence(value: &Value) -> Option<f32> {
    let score = match value.get("confidence_score")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(score.clamp(0.0, 1.0) as f32)
}

fn append_note(notes: &mut Option<String>, note: &str) {
    match notes {
        Some(existing) => {
            existing.push_str(" | ");
            existing.push_str(note);
        }
        None => *notes = Some(note.to_string()),
    }
}
