//! Builders for test messages.

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset};

use jobtrack::email::{RawBody, RawMessage, TransferEncoding};

pub struct MessageBuilder {
    id: String,
    sender: String,
    subject: String,
    body: RawBody,
    received_at: String,
}

impl MessageBuilder {
    /// A plain-text message from `hr@example.com` with an empty body.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            sender: "hr@example.com".to_string(),
            subject: String::new(),
            body: RawBody::Empty,
            received_at: "2024-01-15T10:00:00+00:00".to_string(),
        }
    }

    pub fn sender(mut self, sender: &str) -> Self {
        self.sender = sender.to_string();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.body = RawBody::Text {
            content: content.to_string(),
        };
        self
    }

    pub fn html(mut self, content: &str) -> Self {
        self.body = RawBody::Html {
            content: content.to_string(),
        };
        self
    }

    /// A base64 part that cannot be decoded.
    pub fn broken_base64(mut self) -> Self {
        self.body = RawBody::Encoded {
            mime_type: "text/plain".to_string(),
            encoding: TransferEncoding::Base64,
            data: "%%% not base64 %%%".to_string(),
        };
        self
    }

    pub fn body(mut self, body: RawBody) -> Self {
        self.body = body;
        self
    }

    /// RFC 3339 timestamp.
    pub fn received(mut self, received_at: &str) -> Self {
        self.received_at = received_at.to_string();
        self
    }

    pub fn build(self) -> RawMessage {
        let received_at: DateTime<FixedOffset> =
            DateTime::parse_from_rfc3339(&self.received_at).expect("valid RFC 3339 timestamp");
        RawMessage::new(self.id, self.sender, self.subject, self.body, received_at)
    }
}

/// The rejection email used across the end-to-end tests.
pub fn capgemini_rejection(id: &str) -> RawMessage {
    MessageBuilder::new(id)
        .sender("hr@capgemini.com")
        .subject("Your Application - Data Analyst Intern")
        .text("Dear candidate,\n\nWe regret to inform you that we will not proceed.\n")
        .build()
}

/// An `.eml` file body with the given headers and plain-text body.
pub fn eml(message_id: &str, from: &str, subject: &str, body: &str) -> String {
    format!(
        "From: {}\r\nTo: me@example.com\r\nSubject: {}\r\nMessage-ID: <{}>\r\n\
Date: Mon, 15 Jan 2024 10:00:00 +0000\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        from, subject, message_id, body
    )
}
