//! Normalizes raw message content into plain text.
//!
//! Decoding never fails: every problem is recorded as a [`DecodeWarning`]
//! on the result and the best text that could be recovered is returned.

use std::fmt;
use std::sync::LazyLock;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use log::{debug, warn};
use mail_parser::MessageParser;
use quoted_printable::ParseMode;
use regex::Regex;

use super::html::{collapse_whitespace, html_to_text};
use super::message::{RawBody, RawMessage, TransferEncoding};

static RE_ENCODED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\?[^?\s]+\?[bBqQ]\?[^?\s]*\?=").unwrap());

/// A recoverable problem met while decoding one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// A base64 part could not be decoded with any alphabet.
    InvalidBase64 { mime_type: String },
    /// A quoted-printable part could not be decoded.
    InvalidQuotedPrintable { mime_type: String },
    /// Decoded bytes were not valid UTF-8 and were decoded lossily.
    InvalidUtf8 { mime_type: String },
    /// A full MIME message could not be parsed.
    MalformedMime,
    /// An RFC 2047 encoded word in the subject could not be decoded.
    InvalidEncodedWord { word: String },
    /// No text could be recovered from the body.
    EmptyBody,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::InvalidBase64 { mime_type } => {
                write!(f, "invalid base64 in {} part", mime_type)
            }
            DecodeWarning::InvalidQuotedPrintable { mime_type } => {
                write!(f, "invalid quoted-printable in {} part", mime_type)
            }
            DecodeWarning::InvalidUtf8 { mime_type } => {
                write!(f, "invalid UTF-8 in {} part", mime_type)
            }
            DecodeWarning::MalformedMime => f.write_str("malformed MIME message"),
            DecodeWarning::InvalidEncodedWord { word } => {
                write!(f, "undecodable subject word '{}'", word)
            }
            DecodeWarning::EmptyBody => f.write_str("no readable body text"),
        }
    }
}

/// Plain-text subject and body of one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedContent {
    pub subject: String,
    pub body: String,
    pub warnings: Vec<DecodeWarning>,
}

impl DecodedContent {
    /// Subject and body joined for keyword scanning.
    pub fn full_text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Plain,
    Html,
}

#[derive(Debug)]
struct Fragment {
    kind: FragmentKind,
    text: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentDecoder;

impl ContentDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, message: &RawMessage) -> DecodedContent {
        let mut warnings = Vec::new();
        let subject = decode_subject(&message.subject, &mut warnings);

        let mut fragments = Vec::new();
        let before = warnings.len();
        collect_fragments(&message.body, &mut fragments, &mut warnings);
        let failed = warnings.len() > before;

        let body = select_fragment(fragments, failed);
        if body.is_empty() && !matches!(message.body, RawBody::Empty) {
            warnings.push(DecodeWarning::EmptyBody);
        }

        for warning in &warnings {
            warn!("Message '{}': {}", message.id, warning);
        }

        DecodedContent {
            subject,
            body,
            warnings,
        }
    }
}

/// Plain before HTML; after any part failure, the largest fragment wins.
fn select_fragment(fragments: Vec<Fragment>, any_failure: bool) -> String {
    let mut fragments: Vec<Fragment> = fragments
        .into_iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect();

    let chosen = if any_failure {
        // rev() so the first of equally long fragments wins
        fragments
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, f)| f.text.len())
            .map(|(i, _)| i)
    } else {
        fragments
            .iter()
            .position(|f| f.kind == FragmentKind::Plain)
            .or_else(|| fragments.iter().position(|f| f.kind == FragmentKind::Html))
    };

    match chosen {
        Some(i) => fragments.swap_remove(i).text,
        None => String::new(),
    }
}

fn collect_fragments(body: &RawBody, out: &mut Vec<Fragment>, warnings: &mut Vec<DecodeWarning>) {
    match body {
        RawBody::Empty => {}
        RawBody::Text { content } => out.push(Fragment {
            kind: FragmentKind::Plain,
            text: collapse_whitespace(content),
        }),
        RawBody::Html { content } => out.push(Fragment {
            kind: FragmentKind::Html,
            text: html_to_text(content),
        }),
        RawBody::Encoded {
            mime_type,
            encoding,
            data,
        } => {
            let bytes = match encoding {
                TransferEncoding::Base64 | TransferEncoding::Base64Url => decode_base64(data)
                    .ok_or_else(|| DecodeWarning::InvalidBase64 {
                        mime_type: mime_type.clone(),
                    }),
                TransferEncoding::QuotedPrintable => {
                    quoted_printable::decode(data.as_bytes(), ParseMode::Robust).map_err(|e| {
                        debug!("Quoted-printable part rejected: {}", e);
                        DecodeWarning::InvalidQuotedPrintable {
                            mime_type: mime_type.clone(),
                        }
                    })
                }
            };
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(warning) => {
                    warnings.push(warning);
                    return;
                }
            };
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    warnings.push(DecodeWarning::InvalidUtf8 {
                        mime_type: mime_type.clone(),
                    });
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            push_typed(mime_type, text, out);
        }
        RawBody::Multipart { parts } => {
            for part in parts {
                collect_fragments(part, out, warnings);
            }
        }
        RawBody::Rfc822 { data } => {
            let Some(message) = MessageParser::default().parse(data.as_bytes()) else {
                warnings.push(DecodeWarning::MalformedMime);
                return;
            };
            if let Some(text) = message.body_text(0) {
                out.push(Fragment {
                    kind: FragmentKind::Plain,
                    text: collapse_whitespace(&text),
                });
            }
            if let Some(html) = message.body_html(0) {
                out.push(Fragment {
                    kind: FragmentKind::Html,
                    text: html_to_text(&html),
                });
            }
        }
    }
}

fn push_typed(mime_type: &str, text: String, out: &mut Vec<Fragment>) {
    let mime = mime_type.to_lowercase();
    if mime.starts_with("text/html") {
        out.push(Fragment {
            kind: FragmentKind::Html,
            text: html_to_text(&text),
        });
    } else if mime.starts_with("text/") {
        out.push(Fragment {
            kind: FragmentKind::Plain,
            text: collapse_whitespace(&text),
        });
    } else {
        debug!("Skipping non-text part ({})", mime_type);
    }
}

/// Decodes standard or URL-safe base64, with or without padding,
/// ignoring embedded whitespace.
fn decode_base64(data: &str) -> Option<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let trimmed = compact.trim_end_matches('=');
    STANDARD_NO_PAD
        .decode(trimmed)
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
        .ok()
}

/// Decodes RFC 2047 encoded words by handing the subject to mail-parser
/// as a header. Words it cannot decode stay as they are.
fn decode_subject(subject: &str, warnings: &mut Vec<DecodeWarning>) -> String {
    if !subject.contains("=?") {
        return subject.trim().to_string();
    }

    let header = format!("Subject: {}\r\n\r\n", subject.replace(['\r', '\n'], " "));
    let decoded = MessageParser::default()
        .parse(header.as_bytes())
        .and_then(|message| message.subject().map(str::to_string))
        .unwrap_or_else(|| subject.to_string());

    for word in RE_ENCODED_WORD.find_iter(&decoded) {
        warnings.push(DecodeWarning::InvalidEncodedWord {
            word: word.as_str().to_string(),
        });
    }
    decoded.trim().to_string()
}
