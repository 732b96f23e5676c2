//! Test harness for isolated pipeline runs.
//!
//! Every harness owns a temp directory holding the SQLite database, the
//! fallback CSV file and any input files a test writes.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use jobtrack::config::Config;
use jobtrack::email::{MailSource, RawMessage};
use jobtrack::error::{SourceError, StoreError};
use jobtrack::record::Row;
use jobtrack::storage::{DestinationHandle, PrimaryStore, TabularStore};
use jobtrack::{
    AiError, AiExtractor, CompletionBackend, CsvFileStore, Database, OutputSink, PatternExtractor,
    Pipeline, PipelineConfig, ProcessedTracker, RunReport, SqliteTableStore,
};

pub const DESTINATION: &str = "Job Applications Tracker";

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub fallback_csv: PathBuf,
    pub config: Config,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Uses `config` with its storage paths redirected into the temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        let db_path = temp_dir.path().join("data").join("jobtrack.db");
        let fallback_csv = temp_dir.path().join("fallback.csv");
        config.database_path = Some(db_path.to_string_lossy().into_owned());
        config.fallback_csv_path = fallback_csv.to_string_lossy().into_owned();
        config.destination_name = DESTINATION.to_string();

        let db = Database::open(&db_path).expect("Failed to open database");

        Self {
            temp_dir,
            input_dir,
            fallback_csv,
            config,
            db,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&PipelineConfig::from_config(&self.config))
    }

    /// Pipeline that asks `backend` first, as the CLI does with AI enabled.
    pub fn pipeline_with_ai(&self, backend: ScriptedBackend) -> Pipeline {
        let pipeline = self.pipeline();
        let pattern = PatternExtractor::new(&self.config.keywords, pipeline.classifier());
        let extractor = AiExtractor::new(backend, pattern, self.config.ai.max_body_chars);
        pipeline.with_extractor(Box::new(extractor))
    }

    pub fn tracker(&self) -> ProcessedTracker {
        ProcessedTracker::new(self.db.clone())
    }

    /// SQLite primary with the CSV fallback.
    pub fn sink(&self) -> OutputSink {
        OutputSink::new(
            Box::new(SqliteTableStore::new(self.db.clone(), DESTINATION)),
            Box::new(CsvFileStore::new(&self.fallback_csv)),
            self.tracker(),
        )
    }

    /// A primary that rejects every write, with the CSV fallback.
    pub fn sink_with_failing_primary(&self) -> OutputSink {
        OutputSink::new(
            Box::new(FailingStore::new("primary down")),
            Box::new(CsvFileStore::new(&self.fallback_csv)),
            self.tracker(),
        )
    }

    /// Processes `messages` and persists them through [`Self::sink`].
    pub fn run(&self, messages: Vec<RawMessage>) -> (RunReport, VecSource) {
        self.run_with(messages, &self.sink())
    }

    pub fn run_with(&self, messages: Vec<RawMessage>, sink: &OutputSink) -> (RunReport, VecSource) {
        let mut source = VecSource::new(messages);
        let report = self
            .pipeline()
            .run(&mut source, sink, false)
            .expect("Pipeline run failed");
        (report, source)
    }

    pub fn primary_rows(&self) -> Vec<Row> {
        SqliteTableStore::new(self.db.clone(), DESTINATION)
            .rows()
            .expect("Failed to read primary rows")
    }

    pub fn fallback_rows(&self) -> Vec<Row> {
        if !self.fallback_csv.exists() {
            return Vec::new();
        }
        CsvFileStore::new(&self.fallback_csv)
            .read_rows()
            .expect("Failed to read fallback rows")
    }

    pub fn write_input(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    pub fn write_batch(&self, filename: &str, messages: &[RawMessage]) -> PathBuf {
        let json = serde_json::to_string_pretty(messages).expect("Failed to serialize batch");
        self.write_input(filename, &json)
    }
}

/// In-memory mail source that remembers which ids were marked.
pub struct VecSource {
    messages: Vec<RawMessage>,
    pub marked: Vec<String>,
}

impl VecSource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            marked: Vec::new(),
        }
    }
}

impl MailSource for VecSource {
    fn fetch(&mut self) -> Result<Vec<RawMessage>, SourceError> {
        Ok(self.messages.clone())
    }

    fn mark_processed(&mut self, message_ids: &[String]) -> Result<(), SourceError> {
        self.marked.extend_from_slice(message_ids);
        Ok(())
    }
}

/// A store whose writes always fail.
pub struct FailingStore {
    reason: String,
}

impl FailingStore {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl TabularStore for FailingStore {
    fn name(&self) -> String {
        "failing".to_string()
    }

    fn append_rows(&self, _rows: &[Row]) -> Result<(), StoreError> {
        Err(StoreError::Rejected(self.reason.clone()))
    }
}

impl PrimaryStore for FailingStore {
    fn ensure_destination(&self) -> Result<DestinationHandle, StoreError> {
        Ok(DestinationHandle {
            name: self.name(),
            created: false,
        })
    }
}

/// Completion backend with a canned answer for every prompt.
pub enum ScriptedBackend {
    Reply(&'static str),
    /// Fails with this HTTP status.
    Fails(u16),
}

impl CompletionBackend for ScriptedBackend {
    fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        match self {
            ScriptedBackend::Reply(text) => Ok(text.to_string()),
            ScriptedBackend::Fails(status) => Err(AiError::Status {
                status: *status,
                body: "model overloaded".to_string(),
            }),
        }
    }
}
