use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobtrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    #[error("Mail source error: {0}")]
    Source(#[from] SourceError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures of a single tabular store (primary or secondary).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Destination '{name}' is unavailable: {reason}")]
    DestinationUnavailable { name: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error for '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Store rejected the write: {0}")]
    Rejected(String),
}

/// Failures of the primary/fallback persistence step as a whole.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Fallback store failed after primary failure (primary: {primary}; fallback: {secondary})")]
    SecondaryStoreFailure {
        primary: StoreError,
        #[source]
        secondary: StoreError,
    },

    #[error("Dedup history for {destination} could not be updated, batch not committed: {source}")]
    History {
        destination: String,
        #[source]
        source: crate::db::DatabaseError,
    },

    #[error("Failed to read dedup history: {0}")]
    HistoryLookup(#[source] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse message batch '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Directory scan failed for '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read header row of '{path}': {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{path}' has no company or title column")]
    MissingColumns { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, JobtrackError>;
