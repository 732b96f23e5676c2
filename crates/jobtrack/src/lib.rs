pub mod ai;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod identity;
pub mod importer;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use ai::{AiError, AiExtractor, CompletionBackend, GeminiBackend};
pub use config::{load_config, load_or_create_config, Config};
pub use db::{Database, DatabaseError};
pub use email::{ContentDecoder, DecodedContent, MailSource, RawBody, RawMessage};
pub use error::{
    ConfigError, ImportError, JobtrackError, Result, SinkError, SourceError, StoreError,
};
pub use extract::{ExtractedFields, FieldExtractor, PatternExtractor, StatusClassifier};
pub use identity::IdentityGenerator;
pub use importer::{import_csv, ImportOutcome, ImportWarning};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineWarning, RunReport};
pub use record::{JobApplicationRecord, OutputBatch, Status};
pub use secrets::{resolve_secret, SecretError};
pub use storage::{CsvFileStore, OutputSink, ProcessedTracker, SinkReport, SqliteTableStore};
