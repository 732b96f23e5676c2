//! The extraction-and-identity pipeline.
//!
//! decode → extract → classify → disambiguate → identify → assemble,
//! one message at a time, then one write through the output sink.

pub mod assembler;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod runner;

pub use assembler::{company_or_unknown, position_or_unknown, RecordAssembler};
pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineWarning};
pub use history::{CompanyHistory, EmptyHistory};
pub use runner::{BatchOutcome, Pipeline, RunReport};
