//! Raw message as delivered by a mail source.

use chrono::{DateTime, FixedOffset};
use log::debug;
use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};

/// Transfer encoding of an [`RawBody::Encoded`] part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferEncoding {
    Base64,
    #[serde(rename = "base64url")]
    Base64Url,
    QuotedPrintable,
}

/// Message body as delivered, possibly nested and encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawBody {
    #[default]
    Empty,
    Text {
        content: String,
    },
    Html {
        content: String,
    },
    Encoded {
        mime_type: String,
        encoding: TransferEncoding,
        data: String,
    },
    Multipart {
        parts: Vec<RawBody>,
    },
    /// A complete MIME message (headers and body).
    Rfc822 {
        data: String,
    },
}

/// An unprocessed email. Owned by the mail source; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    pub id: String,
    pub sender: String,
    pub subject: String,
    #[serde(default)]
    pub body: RawBody,
    pub received_at: DateTime<FixedOffset>,
}

impl RawMessage {
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: RawBody,
        received_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            subject: subject.into(),
            body,
            received_at,
        }
    }

    /// Builds a message from a raw RFC 822 byte stream (e.g. an `.eml` file).
    ///
    /// Header values that cannot be read fall back to `fallback_id`, an
    /// empty sender/subject and `fallback_received`. The body is kept raw
    /// and decoded later, so a malformed message still yields a value.
    pub fn from_rfc822(
        fallback_id: &str,
        raw: &[u8],
        fallback_received: DateTime<FixedOffset>,
    ) -> Self {
        let data = String::from_utf8_lossy(raw).into_owned();

        let Some(message) = MessageParser::default().parse(raw) else {
            debug!("Could not parse headers of message '{}'", fallback_id);
            return Self::new(
                fallback_id,
                "",
                "",
                RawBody::Rfc822 { data },
                fallback_received,
            );
        };

        let id = message
            .message_id()
            .filter(|id| !id.trim().is_empty())
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| fallback_id.to_string());
        let sender = message
            .from()
            .and_then(|addr| addr.first())
            .map(|addr| match (addr.name(), addr.address()) {
                (Some(name), Some(address)) => format!("{} <{}>", name, address),
                (None, Some(address)) => address.to_string(),
                (Some(name), None) => name.to_string(),
                (None, None) => String::new(),
            })
            .unwrap_or_default();
        let subject = message.subject().unwrap_or_default().to_string();
        let received_at = message
            .date()
            .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
            .unwrap_or(fallback_received);

        Self::new(id, sender, subject, RawBody::Rfc822 { data }, received_at)
    }
}
