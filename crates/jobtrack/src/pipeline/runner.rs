use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use crate::email::{ContentDecoder, MailSource, RawMessage};
use crate::extract::pattern::PATTERN_SOURCE;
use crate::extract::{
    ExtractedFields, FieldExtractor, PatternExtractor, PositionKeyExtractor, StatusClassifier,
};
use crate::identity::IdentityGenerator;
use crate::record::{JobApplicationRecord, OutputBatch, UNKNOWN_COMPANY, UNKNOWN_POSITION};
use crate::sanitize;
use crate::storage::{OutputSink, SinkReport};

use super::assembler::{company_or_unknown, position_or_unknown, RecordAssembler};
use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::history::{BatchHistory, CompanyHistory};

/// Records and warnings from one batch, in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub batch: OutputBatch,
    pub warnings: Vec<PipelineWarning>,
}

/// Result of [`Pipeline::run`]. `sink` is `None` for a dry run.
#[derive(Debug)]
pub struct RunReport {
    pub batch: OutputBatch,
    pub sink: Option<SinkReport>,
    pub warnings: Vec<PipelineWarning>,
}

pub struct Pipeline {
    decoder: ContentDecoder,
    /// Alternate extractor tried before pattern matching.
    extractor: Option<Box<dyn FieldExtractor>>,
    pattern: PatternExtractor,
    classifier: Arc<StatusClassifier>,
    key_extractor: PositionKeyExtractor,
    identity: IdentityGenerator,
    assembler: RecordAssembler,
}

impl Pipeline {
    /// Builds the pattern-matching pipeline from config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let classifier = Arc::new(StatusClassifier::new(&config.keywords.status));
        Self {
            decoder: ContentDecoder::new(),
            extractor: None,
            pattern: PatternExtractor::new(&config.keywords, Arc::clone(&classifier)),
            key_extractor: PositionKeyExtractor::new(
                &config.keywords.position_disambiguation_or_default(),
            ),
            classifier,
            identity: IdentityGenerator::new(config.identity.clone()),
            assembler: RecordAssembler::new(),
        }
    }

    /// Tries `extractor` first for every message, falling back to
    /// pattern matching when it fails.
    pub fn with_extractor(mut self, extractor: Box<dyn FieldExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn classifier(&self) -> Arc<StatusClassifier> {
        Arc::clone(&self.classifier)
    }

    /// Turns messages into records. Per-message problems become warnings;
    /// only a history lookup failure is an error.
    pub fn process_batch(
        &self,
        messages: &[RawMessage],
        history: &dyn CompanyHistory,
    ) -> Result<BatchOutcome, PipelineError> {
        let mut batch_history = BatchHistory::new(history);
        let mut outcome = BatchOutcome::default();

        for message in messages {
            let (record, warnings) = self.process_message(message, &batch_history)?;
            batch_history.record(&record.company);
            outcome.batch.push(record);
            outcome.warnings.extend(warnings);
        }

        Ok(outcome)
    }

    /// Runs one message through every step.
    pub fn process_message(
        &self,
        message: &RawMessage,
        history: &dyn CompanyHistory,
    ) -> Result<(JobApplicationRecord, Vec<PipelineWarning>), PipelineError> {
        let sender = sanitize::redact_address(&message.sender);
        let _span = info_span!("message",
            message_id = %sanitize::hash_value(&message.id),
            sender = %sender,
        )
        .entered();

        let mut ctx = PipelineContext::new(message);

        {
            let _step = info_span!("decode").entered();
            self.step_decode(&mut ctx);
        }
        {
            let _step = info_span!("extract").entered();
            self.step_extract(&mut ctx);
        }
        {
            let _step = info_span!("classify").entered();
            self.step_classify(&mut ctx);
        }
        {
            let _step = info_span!("disambiguate").entered();
            self.step_disambiguate(&mut ctx, history)?;
        }
        {
            let _step = info_span!("identify").entered();
            self.step_identify(&mut ctx, history)?;
        }

        let record = self.step_assemble(&mut ctx);
        debug!(
            "Message -> {} / {} / {}",
            record.company, record.position, record.status
        );
        Ok((record, ctx.warnings))
    }

    /// Fetches, processes and persists one batch from `source`.
    ///
    /// Messages are marked processed only after the sink confirmed the
    /// write; a failed write leaves them for the next run.
    pub fn run(
        &self,
        source: &mut dyn MailSource,
        sink: &OutputSink,
        dry_run: bool,
    ) -> Result<RunReport, PipelineError> {
        let messages = source.fetch()?;
        let _span = info_span!("pipeline_run", messages = messages.len(), dry_run).entered();

        let outcome = self.process_batch(&messages, sink.tracker())?;
        for warning in &outcome.warnings {
            warn!("{}", warning);
        }

        if dry_run {
            info!("Dry run: {} record(s) not persisted", outcome.batch.len());
            return Ok(RunReport {
                batch: outcome.batch,
                sink: None,
                warnings: outcome.warnings,
            });
        }

        let report = sink.persist(&outcome.batch)?;
        let mut warnings = outcome.warnings;

        let durable = report.durable_ids();
        if let Err(e) = source.mark_processed(&durable) {
            warn!("Records are stored but messages were not marked: {}", e);
            warnings.push(PipelineWarning::MarkProcessedFailed {
                error: e.to_string(),
            });
        }

        info!(
            "Run complete: {} appended, {} already recorded",
            report.appended.len(),
            report.skipped.len()
        );
        Ok(RunReport {
            batch: outcome.batch,
            sink: Some(report),
            warnings,
        })
    }

    fn step_decode(&self, ctx: &mut PipelineContext<'_>) {
        let decoded = self.decoder.decode(ctx.message);
        for warning in &decoded.warnings {
            ctx.warnings.push(PipelineWarning::Decode {
                message_id: ctx.message.id.clone(),
                warning: warning.clone(),
            });
        }
        ctx.decoded = Some(decoded);
    }

    fn step_extract(&self, ctx: &mut PipelineContext<'_>) {
        let Some(decoded) = ctx.decoded.as_ref() else {
            return;
        };
        let message = ctx.message;

        let fields = match &self.extractor {
            Some(extractor) => {
                match extractor.extract(message, decoded) {
                    Ok(fields) => fields,
                    Err(e) => {
                        warn!("{} extractor failed: {}", extractor.name(), e);
                        ctx.warnings.push(PipelineWarning::ExtractorFallback {
                            message_id: message.id.clone(),
                            extractor: extractor.name().to_string(),
                            error: e.to_string(),
                        });
                        self.pattern.extract_fields(decoded, &message.sender)
                    }
                }
            }
            None => self.pattern.extract_fields(decoded, &message.sender),
        };

        if fields.company.trim().is_empty() {
            ctx.warnings.push(PipelineWarning::UnknownCompany {
                message_id: message.id.clone(),
            });
        }
        if fields.position.trim().is_empty() {
            ctx.warnings.push(PipelineWarning::UnknownPosition {
                message_id: message.id.clone(),
            });
        }
        ctx.fields = Some(fields);
    }

    fn step_classify(&self, ctx: &mut PipelineContext<'_>) {
        let Some(fields) = ctx.fields.as_ref() else {
            return;
        };
        ctx.status = self
            .classifier
            .resolve(&fields.status_hits)
            .or(fields.status_hint)
            .unwrap_or_default();
    }

    /// Picks a disambiguation keyword when the company already has records.
    fn step_disambiguate(
        &self,
        ctx: &mut PipelineContext<'_>,
        history: &dyn CompanyHistory,
    ) -> Result<(), PipelineError> {
        let (Some(fields), Some(decoded)) = (ctx.fields.as_ref(), ctx.decoded.as_ref()) else {
            return Ok(());
        };
        let company = company_or_unknown(&fields.company);
        if history.has_company(&company, &ctx.message.id)? {
            ctx.keyword = self
                .key_extractor
                .extract(&decoded.subject, &position_or_unknown(&fields.position));
            debug!("Company collision, keyword '{}'", ctx.keyword);
        }
        Ok(())
    }

    /// Reuses the id of an already recorded message, else generates one.
    fn step_identify(
        &self,
        ctx: &mut PipelineContext<'_>,
        history: &dyn CompanyHistory,
    ) -> Result<(), PipelineError> {
        if let Some(id) = history.recorded_id(&ctx.message.id)? {
            ctx.record_id = Some(id);
            return Ok(());
        }
        let (company, position) = match ctx.fields.as_ref() {
            Some(fields) => (
                company_or_unknown(&fields.company),
                position_or_unknown(&fields.position),
            ),
            None => (UNKNOWN_COMPANY.to_string(), UNKNOWN_POSITION.to_string()),
        };
        ctx.record_id = Some(
            self.identity
                .generate(&company, &position, &ctx.keyword, &ctx.message.id),
        );
        Ok(())
    }

    fn step_assemble(&self, ctx: &mut PipelineContext<'_>) -> JobApplicationRecord {
        let decoded = ctx.decoded.take().unwrap_or_default();
        let fields = ctx.fields.take().unwrap_or_else(|| ExtractedFields {
            source: PATTERN_SOURCE.to_string(),
            ..Default::default()
        });
        let id = ctx.record_id.take().unwrap_or_else(|| {
            self.identity.generate(
                &company_or_unknown(&fields.company),
                &position_or_unknown(&fields.position),
                &ctx.keyword,
                &ctx.message.id,
            )
        });

        self.assembler.assemble(
            ctx.message,
            &decoded.subject,
            &fields,
            ctx.status,
            id,
            Utc::now(),
        )
    }
}
