//! Google Generative Language API backend.

use std::time::Duration;

use log::debug;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::secrets::resolve_secret;

use super::{AiError, CompletionBackend};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GeminiBackend {
    client: reqwest::blocking::Client,
    url: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiBackend {
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = resolve_secret(
            config.api_key.as_deref(),
            config.api_key_file.as_deref(),
            Some(config.api_key_env.as_str()),
        )?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: format!(
                "{}/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }
}

impl CompletionBackend for GeminiBackend {
    fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .map_err(|e| AiError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AiError::Request(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        debug!("generateContent returned {} bytes", body.len());

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .next()
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(text)
    }
}
