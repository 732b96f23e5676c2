use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use jobtrack::config::{load_or_create_config, write_config, Config};
use jobtrack::email::{EmlDirectorySource, JsonBatchSource, MailSource};
use jobtrack::storage::SinkDestination;
use jobtrack::{
    import_csv, logging, AiExtractor, CsvFileStore, Database, GeminiBackend, IdentityGenerator,
    OutputBatch, OutputSink, PatternExtractor, Pipeline, PipelineConfig, ProcessedTracker,
    SinkReport, SqliteTableStore,
};

#[derive(Parser)]
#[command(
    name = "jobtrack",
    version,
    about = "Turns job application emails into deduplicated tracker rows"
)]
struct Cli {
    /// Configuration file; created with defaults when missing
    #[arg(long, global = true, default_value = "jobtrack.json")]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a directory of .eml files or a JSON message batch
    Run {
        /// Directory of .eml files, or a .json file with an array of messages
        #[arg(short, long)]
        input: PathBuf,

        /// Print the records instead of storing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Import applications from a CSV export
    Import {
        /// CSV file with a header row
        path: PathBuf,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show dedup history statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json_logs).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Run { input, dry_run } => run(&cli.config, &input, dry_run),
        Commands::Import { path } => import(&cli.config, &path),
        Commands::InitConfig { force } => init_config(&cli.config, force),
        Commands::Stats => stats(&cli.config),
    }
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let path = config.database_path();
    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn build_sink(config: &Config, db: &Database) -> OutputSink {
    OutputSink::new(
        Box::new(SqliteTableStore::new(db.clone(), config.destination_name.clone())),
        Box::new(CsvFileStore::new(&config.fallback_csv_path)),
        ProcessedTracker::new(db.clone()),
    )
}

fn build_pipeline(config: &Config) -> Pipeline {
    let pipeline = Pipeline::from_config(&PipelineConfig::from_config(config));
    if !config.ai.enabled {
        return pipeline;
    }

    match GeminiBackend::from_config(&config.ai) {
        Ok(backend) => {
            info!("Using {} for field extraction", config.ai.model);
            let pattern = PatternExtractor::new(&config.keywords, pipeline.classifier());
            let extractor = AiExtractor::new(backend, pattern, config.ai.max_body_chars);
            pipeline.with_extractor(Box::new(extractor))
        }
        Err(e) => {
            warn!("AI extraction disabled: {}", e);
            pipeline
        }
    }
}

fn run(config_path: &Path, input: &Path, dry_run: bool) -> anyhow::Result<()> {
    let config = load_or_create_config(config_path);
    let db = open_database(&config)?;
    let sink = build_sink(&config, &db);
    let pipeline = build_pipeline(&config);

    let mut source: Box<dyn MailSource> = if input.is_dir() {
        Box::new(EmlDirectorySource::new(input))
    } else if input.is_file() {
        Box::new(JsonBatchSource::new(input))
    } else {
        bail!("Input {} does not exist", input.display());
    };

    let report = pipeline.run(source.as_mut(), &sink, dry_run)?;
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }

    match report.sink {
        None => print_records(&report.batch)?,
        Some(sink_report) => print_sink_report(&sink_report),
    }
    Ok(())
}

fn import(config_path: &Path, path: &Path) -> anyhow::Result<()> {
    let config = load_or_create_config(config_path);
    let db = open_database(&config)?;
    let sink = build_sink(&config, &db);
    let identity = IdentityGenerator::new(config.identity.clone());

    let outcome = import_csv(path, &identity, Utc::now())?;
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }

    let report = sink.persist(&outcome.batch)?;
    print_sink_report(&report);
    Ok(())
}

fn init_config(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    write_config(config_path, &Config::default())?;
    println!("Wrote default configuration to {}", config_path.display());
    Ok(())
}

fn stats(config_path: &Path) -> anyhow::Result<()> {
    let config = load_or_create_config(config_path);
    let db = open_database(&config)?;
    let stats = ProcessedTracker::new(db.clone()).stats()?;
    let rows = SqliteTableStore::new(db, config.destination_name.clone()).row_count()?;

    println!("Processed messages: {}", stats.total_processed);
    println!("Companies:          {}", stats.companies);
    println!("Rows in '{}': {}", config.destination_name, rows);
    for (destination, count) in &stats.by_destination {
        println!("  {:<30} {}", destination, count);
    }
    if let Some(last) = &stats.last_processed_at {
        println!("Last processed:     {}", last);
    }
    Ok(())
}

fn print_records(batch: &OutputBatch) -> anyhow::Result<()> {
    for record in batch.iter() {
        println!("{}", serde_json::to_string(record)?);
    }
    println!("{} record(s), nothing stored (dry run)", batch.len());
    Ok(())
}

fn print_sink_report(report: &SinkReport) {
    match &report.destination {
        SinkDestination::Primary { name } => {
            println!("Appended {} row(s) to '{}'", report.appended.len(), name);
        }
        SinkDestination::Fallback {
            name,
            primary_error,
        } => {
            println!(
                "Primary store failed ({}); appended {} row(s) to fallback {}",
                primary_error,
                report.appended.len(),
                name
            );
        }
        SinkDestination::Unchanged => println!("Nothing new to append"),
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} already recorded message(s)", report.skipped.len());
    }
}
