use crate::config::schema::{IdentityConfig, KeywordsConfig};
use crate::config::Config;

/// The slice of [`Config`] the pipeline reads, fixed for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub keywords: KeywordsConfig,
    pub identity: IdentityConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keywords: config.keywords.clone(),
            identity: config.identity.clone(),
        }
    }
}
