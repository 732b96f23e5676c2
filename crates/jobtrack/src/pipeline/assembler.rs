use chrono::{DateTime, Utc};

use crate::email::RawMessage;
use crate::extract::ExtractedFields;
use crate::record::{JobApplicationRecord, Status, UNKNOWN_COMPANY, UNKNOWN_POSITION};

const NOTES_SEPARATOR: &str = " | ";

/// Builds records from extracted values. Pure value construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordAssembler;

impl RecordAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        message: &RawMessage,
        subject: &str,
        fields: &ExtractedFields,
        status: Status,
        id: String,
        now: DateTime<Utc>,
    ) -> JobApplicationRecord {
        JobApplicationRecord {
            id,
            company: company_or_unknown(&fields.company),
            position: position_or_unknown(&fields.position),
            status,
            application_date: message.received_at.date_naive(),
            source_message_id: message.id.clone(),
            email_date: message.received_at.to_rfc3339(),
            source: fields.source.clone(),
            notes: build_notes(subject, fields),
            last_updated: now,
        }
    }
}

pub fn company_or_unknown(company: &str) -> String {
    let company = company.trim();
    if company.is_empty() {
        UNKNOWN_COMPANY.to_string()
    } else {
        company.to_string()
    }
}

pub fn position_or_unknown(position: &str) -> String {
    let position = position.trim();
    if position.is_empty() {
        UNKNOWN_POSITION.to_string()
    } else {
        position.to_string()
    }
}

/// `Subject: ...` followed by extractor attributes, confidence and notes.
fn build_notes(subject: &str, fields: &ExtractedFields) -> String {
    let mut segments = Vec::new();
    if !subject.trim().is_empty() {
        segments.push(format!("Subject: {}", subject.trim()));
    }
    for (label, value) in &fields.attributes {
        if !value.trim().is_empty() {
            segments.push(format!("{}: {}", label, value.trim()));
        }
    }
    if let Some(confidence) = fields.confidence {
        segments.push(format!("Confidence: {:.2}", confidence));
    }
    if let Some(notes) = fields.extractor_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        segments.push(format!("Extractor Notes: {}", notes.trim()));
    }
    segments.join(NOTES_SEPARATOR)
}
