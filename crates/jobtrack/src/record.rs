//! The persisted job application record and its wire row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Column order shared by the primary and fallback stores.
pub const COLUMNS: [&str; 9] = [
    "company",
    "position",
    "applicationDate",
    "status",
    "sourceMessageId",
    "emailDate",
    "source",
    "notes",
    "lastUpdated",
];

/// One store row, field values in [`COLUMNS`] order.
pub type Row = [String; 9];

pub const UNKNOWN_COMPANY: &str = "Unknown";
pub const UNKNOWN_POSITION: &str = "Unknown Position";

/// Closed status vocabulary of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Status {
    #[default]
    Applied,
    Interview,
    Rejected,
    Accepted,
    Withdrawn,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::Interview,
        Status::Rejected,
        Status::Accepted,
        Status::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interview => "Interview",
            Status::Rejected => "Rejected",
            Status::Accepted => "Accepted",
            Status::Withdrawn => "Withdrawn",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(Status::Applied),
            "interview" => Ok(Status::Interview),
            "rejected" => Ok(Status::Rejected),
            "accepted" | "offer" => Ok(Status::Accepted),
            "withdrawn" => Ok(Status::Withdrawn),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A structured, deduplicated job application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicationRecord {
    pub id: String,
    pub company: String,
    pub position: String,
    pub status: Status,
    pub application_date: NaiveDate,
    pub source_message_id: String,
    /// Received timestamp of the source message, RFC 3339.
    pub email_date: String,
    /// Which extractor produced the record.
    pub source: String,
    pub notes: String,
    pub last_updated: DateTime<Utc>,
}

impl JobApplicationRecord {
    /// Renders the record as a row in [`COLUMNS`] order.
    pub fn to_row(&self) -> Row {
        [
            self.company.clone(),
            self.position.clone(),
            self.application_date.format("%Y-%m-%d").to_string(),
            self.status.to_string(),
            self.source_message_id.clone(),
            self.email_date.clone(),
            self.source.clone(),
            self.notes.clone(),
            self.last_updated.to_rfc3339(),
        ]
    }
}

/// Records produced by one pipeline run, in input message order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputBatch {
    records: Vec<JobApplicationRecord>,
}

impl OutputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: JobApplicationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[JobApplicationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobApplicationRecord> {
        self.records.iter()
    }

    pub fn to_rows(&self) -> Vec<Row> {
        self.records.iter().map(JobApplicationRecord::to_row).collect()
    }
}

impl From<Vec<JobApplicationRecord>> for OutputBatch {
    fn from(records: Vec<JobApplicationRecord>) -> Self {
        Self { records }
    }
}

impl IntoIterator for OutputBatch {
    type Item = JobApplicationRecord;
    type IntoIter = std::vec::IntoIter<JobApplicationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("rejected".parse::<Status>().unwrap(), Status::Rejected);
        assert_eq!(" Interview ".parse::<Status>().unwrap(), Status::Interview);
        assert_eq!("OFFER".parse::<Status>().unwrap(), Status::Accepted);
        assert!("ghosted".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_default_is_applied() {
        assert_eq!(Status::default(), Status::Applied);
    }

    #[test]
    fn test_row_follows_column_order() {
        let record = JobApplicationRecord {
            id: "acme_engineer_0011aabb".to_string(),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            status: Status::Interview,
            application_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            source_message_id: "m1".to_string(),
            email_date: "2024-01-15T10:00:00+00:00".to_string(),
            source: "Email (Pattern)".to_string(),
            notes: "Subject: Hello".to_string(),
            last_updated: Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap(),
        };

        let row = record.to_row();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], "Acme");
        assert_eq!(row[2], "2024-01-15");
        assert_eq!(row[3], "Interview");
        assert_eq!(row[4], "m1");
        assert_eq!(row[8], "2024-01-16T08:00:00+00:00");
    }
}
