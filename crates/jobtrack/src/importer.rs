//! Import of applications tracked by hand in a spreadsheet export.
//!
//! Each CSV row becomes a record with a synthetic source message id
//! (`import:<file stem>:<row>`), so importing the same file twice is
//! deduplicated by the output sink like any rerun.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};

use crate::error::ImportError;
use crate::identity::IdentityGenerator;
use crate::pipeline::{company_or_unknown, position_or_unknown};
use crate::record::{JobApplicationRecord, OutputBatch, Status};

pub const IMPORT_SOURCE: &str = "CSV Import";

const COMPANY_HEADERS: &[&str] = &["company"];
const POSITION_HEADERS: &[&str] = &["title", "position", "role"];
const DATE_HEADERS: &[&str] = &[
    "applied date",
    "application_date",
    "applied_date",
    "date_applied",
    "date",
];
const LINK_HEADERS: &[&str] = &["link", "url"];
const STATUS_HEADERS: &[&str] = &["status"];

/// A row-level problem; the row is still imported unless noted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// The date could not be read; the import date was used.
    UnparsedDate { row: usize, value: String },
    /// The status is not a known value; `Applied` was used.
    UnknownStatus { row: usize, value: String },
    /// The row could not be read and was skipped.
    SkippedRow { row: usize, error: String },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::UnparsedDate { row, value } => {
                write!(f, "row {}: unreadable date '{}', using today", row, value)
            }
            ImportWarning::UnknownStatus { row, value } => {
                write!(f, "row {}: unknown status '{}', using Applied", row, value)
            }
            ImportWarning::SkippedRow { row, error } => {
                write!(f, "row {}: skipped ({})", row, error)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub batch: OutputBatch,
    pub warnings: Vec<ImportWarning>,
}

/// Header positions of the recognised columns.
#[derive(Debug, Default)]
struct ColumnMap {
    company: Option<usize>,
    position: Option<usize>,
    date: Option<usize>,
    link: Option<usize>,
    status: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        // Candidate order decides when several headers match.
        let find = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|c| lowered.iter().position(|h| h == c))
        };
        Self {
            company: find(COMPANY_HEADERS),
            position: find(POSITION_HEADERS),
            date: find(DATE_HEADERS),
            link: find(LINK_HEADERS),
            status: find(STATUS_HEADERS),
        }
    }
}

/// Reads `path` into an [`OutputBatch`] without persisting it.
pub fn import_csv(
    path: &Path,
    identity: &IdentityGenerator,
    now: DateTime<Utc>,
) -> Result<ImportOutcome, ImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| ImportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader.headers().map_err(|source| ImportError::Header {
        path: path.to_path_buf(),
        source,
    })?;
    let columns = ColumnMap::from_headers(headers);
    if columns.company.is_none() && columns.position.is_none() {
        return Err(ImportError::MissingColumns {
            path: path.to_path_buf(),
        });
    }
    debug!("Import columns: {:?}", columns);

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("import");

    let mut outcome = ImportOutcome::default();
    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        let fields = match result {
            Ok(fields) => fields,
            Err(e) => {
                outcome.warnings.push(ImportWarning::SkippedRow {
                    row,
                    error: e.to_string(),
                });
                continue;
            }
        };
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        let record = record_from_row(&fields, &columns, row, stem, identity, now, &mut outcome.warnings);
        outcome.batch.push(record);
    }

    for warning in &outcome.warnings {
        warn!("{}: {}", path.display(), warning);
    }
    info!("Read {} application(s) from {}", outcome.batch.len(), path.display());
    Ok(outcome)
}

fn record_from_row(
    fields: &StringRecord,
    columns: &ColumnMap,
    row: usize,
    stem: &str,
    identity: &IdentityGenerator,
    now: DateTime<Utc>,
    warnings: &mut Vec<ImportWarning>,
) -> JobApplicationRecord {
    let value = |column: Option<usize>| cell(fields, column);

    let company = company_or_unknown(value(columns.company));
    let position = position_or_unknown(value(columns.position));

    let raw_date = value(columns.date);
    let application_date = match parse_date(raw_date) {
        Some(date) => date,
        None => {
            if !raw_date.is_empty() {
                warnings.push(ImportWarning::UnparsedDate {
                    row,
                    value: raw_date.to_string(),
                });
            }
            now.date_naive()
        }
    };

    let raw_status = value(columns.status);
    let status = if raw_status.is_empty() {
        Status::Applied
    } else {
        raw_status.parse::<Status>().unwrap_or_else(|_| {
            warnings.push(ImportWarning::UnknownStatus {
                row,
                value: raw_status.to_string(),
            });
            Status::Applied
        })
    };

    let mut notes = String::from("Imported from CSV");
    let link = value(columns.link);
    if !link.is_empty() {
        notes.push_str(" | Link: ");
        notes.push_str(link);
    }

    let source_message_id = format!("import:{}:{}", stem, row);
    JobApplicationRecord {
        id: identity.generate(&company, &position, "", &source_message_id),
        company,
        position,
        status,
        application_date,
        source_message_id,
        email_date: String::new(),
        source: IMPORT_SOURCE.to_string(),
        notes,
        last_updated: now,
    }
}

fn cell(fields: &StringRecord, column: Option<usize>) -> &str {
    column.and_then(|i| fields.get(i)).unwrap_or("").trim()
}

/// Spreadsheet date in any of the common export formats.
///
/// Slash dates are read as `MM/DD/YYYY` unless the first field cannot
/// be a month.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    let parts: Vec<u32> = value
        .split('/')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let [first, second, year] = parts[..] else {
        return None;
    };
    let (month, day) = if first > 12 { (second, first) } else { (first, second) };
    NaiveDate::from_ymd_opt(year as i32, month, day)
}
