//! Stand-in used when the "ai" feature is disabled.

use crate::config::AiConfig;

use super::{AiError, CompletionBackend};

pub struct GeminiBackend {
    _private: (),
}

impl GeminiBackend {
    pub fn from_config(_config: &AiConfig) -> Result<Self, AiError> {
        Err(AiError::NotEnabled)
    }
}

impl CompletionBackend for GeminiBackend {
    fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::NotEnabled)
    }
}
