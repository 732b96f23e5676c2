use std::fmt;

use thiserror::Error;

use crate::email::DecodeWarning;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch messages: {0}")]
    Source(#[from] crate::error::SourceError),

    #[error("Company history lookup failed: {0}")]
    History(#[from] crate::db::DatabaseError),

    #[error("Persisting the batch failed: {0}")]
    Sink(#[from] crate::error::SinkError),
}

/// Per-message problems. They never abort a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    Decode {
        message_id: String,
        warning: DecodeWarning,
    },
    ExtractorFallback {
        message_id: String,
        extractor: String,
        error: String,
    },
    UnknownCompany {
        message_id: String,
    },
    UnknownPosition {
        message_id: String,
    },
    /// Records are stored but the source could not hide the messages.
    MarkProcessedFailed {
        error: String,
    },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::Decode {
                message_id,
                warning,
            } => write!(f, "{}: {}", message_id, warning),
            PipelineWarning::ExtractorFallback {
                message_id,
                extractor,
                error,
            } => write!(
                f,
                "{}: {} extractor failed, used pattern matching ({})",
                message_id, extractor, error
            ),
            PipelineWarning::UnknownCompany { message_id } => {
                write!(f, "{}: company not detected", message_id)
            }
            PipelineWarning::UnknownPosition { message_id } => {
                write!(f, "{}: position not detected", message_id)
            }
            PipelineWarning::MarkProcessedFailed { error } => {
                write!(f, "could not mark messages processed: {}", error)
            }
        }
    }
}
