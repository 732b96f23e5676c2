//! Language-model field extraction.
//!
//! [`AiExtractor`] works against any [`CompletionBackend`]. The HTTP
//! backend is only compiled with the "ai" feature; without it
//! [`GeminiBackend::from_config`] reports the feature as disabled.

mod extractor;

#[cfg(feature = "ai")]
mod gemini;

#[cfg(not(feature = "ai"))]
mod gemini_stub;

pub use extractor::{AiExtractor, AI_SOURCE};

#[cfg(feature = "ai")]
pub use gemini::GeminiBackend;

#[cfg(not(feature = "ai"))]
pub use gemini_stub::GeminiBackend;

use thiserror::Error;

use crate::extract::ExtractError;
use crate::secrets::SecretError;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI support not compiled in (enable the \"ai\" feature)")]
    NotEnabled,

    #[error("API key unavailable: {0}")]
    ApiKey(#[from] SecretError),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend returned no text")]
    EmptyResponse,

    #[error("No JSON object in response")]
    NoJson,

    #[error("Failed to parse response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<AiError> for ExtractError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotEnabled | AiError::ApiKey(_) => ExtractError::Unavailable(err.to_string()),
            other => ExtractError::Failed(other.to_string()),
        }
    }
}

/// Sends a prompt to a language model and returns its raw text reply.
pub trait CompletionBackend {
    fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for Box<B> {
    fn complete(&self, prompt: &str) -> Result<String, AiError> {
        (**self).complete(prompt)
    }
}
