use crate::email::{DecodedContent, RawMessage};
use crate::extract::ExtractedFields;
use crate::record::Status;

use super::error::PipelineWarning;

/// State of one message as it moves through the pipeline steps.
pub struct PipelineContext<'a> {
    // Input
    pub message: &'a RawMessage,

    // Step 1 result, Some after step_decode
    pub decoded: Option<DecodedContent>,

    // Step 2 result, Some after step_extract
    pub fields: Option<ExtractedFields>,

    // Step 3 result
    pub status: Status,

    // Step 4 result, empty unless the company collided
    pub keyword: String,

    // Step 5 result
    pub record_id: Option<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(message: &'a RawMessage) -> Self {
        Self {
            message,
            decoded: None,
            fields: None,
            status: Status::default(),
            keyword: String::new(),
            record_id: None,
            warnings: Vec::new(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message.id
    }
}
