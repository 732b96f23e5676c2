//! Dedup history of messages whose records are durably stored.

use std::collections::HashSet;

use chrono::Utc;
use log::debug;
use rusqlite::Connection;

use crate::db::processed_repo::{self, ProcessedMessageRow};
use crate::db::{Database, DatabaseError};
use crate::extract::company_key;
use crate::pipeline::CompanyHistory;
use crate::record::JobApplicationRecord;

/// Tracks which source messages already produced a stored record.
#[derive(Clone)]
pub struct ProcessedTracker {
    db: Database,
}

impl ProcessedTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn is_processed(&self, message_id: &str) -> Result<bool, DatabaseError> {
        let found = processed_repo::find_processed_ids(&self.db, &[message_id.to_string()])?;
        Ok(!found.is_empty())
    }

    /// Keeps only the ids that have not been recorded, preserving order.
    pub fn filter_unprocessed(&self, message_ids: Vec<String>) -> Result<Vec<String>, DatabaseError> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let processed = processed_repo::find_processed_ids(&self.db, &message_ids)?;
        let unprocessed: Vec<String> = message_ids
            .into_iter()
            .filter(|id| !processed.contains(id))
            .collect();

        debug!(
            "Filtered {} message ids, {} unprocessed",
            processed.len() + unprocessed.len(),
            unprocessed.len()
        );
        Ok(unprocessed)
    }

    pub fn processed_ids(&self, message_ids: &[String]) -> Result<HashSet<String>, DatabaseError> {
        processed_repo::find_processed_ids(&self.db, message_ids)
    }

    /// Records that `records` are stored in `destination`.
    pub fn mark_recorded(
        &self,
        records: &[&JobApplicationRecord],
        destination: &str,
    ) -> Result<usize, DatabaseError> {
        let rows = history_rows(records, destination);
        let inserted = processed_repo::insert_many(&self.db, &rows)?;
        debug!("Marked {} message(s) as recorded in '{}'", inserted, destination);
        Ok(inserted)
    }

    /// Stages the history entries for `records`, runs `write` and commits
    /// both only if `write` succeeds.
    ///
    /// `write` gets the open transaction so a store in the same database
    /// can append on it. It must not use this tracker's database
    /// otherwise.
    pub fn record_with<F, T, E>(
        &self,
        records: &[&JobApplicationRecord],
        destination: &str,
        write: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Database, &Connection) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let rows = history_rows(records, destination);
        self.db.transaction(|conn| {
            let staged = processed_repo::insert_many_with(conn, &rows)?;
            let value = write(&self.db, conn)?;
            debug!("Recorded {} message(s) in '{}'", staged, destination);
            Ok(value)
        })
    }

    pub fn has_company_elsewhere(
        &self,
        company: &str,
        excluding_message_id: &str,
    ) -> Result<bool, DatabaseError> {
        processed_repo::company_recorded_elsewhere(
            &self.db,
            &company_key(company),
            excluding_message_id,
        )
    }

    pub fn stats(&self) -> Result<TrackerStats, DatabaseError> {
        Ok(TrackerStats {
            total_processed: processed_repo::count(&self.db)?,
            companies: processed_repo::count_companies(&self.db)?,
            by_destination: processed_repo::count_by_destination(&self.db)?,
            last_processed_at: processed_repo::find_last_processed_at(&self.db)?,
        })
    }
}

impl CompanyHistory for ProcessedTracker {
    fn has_company(&self, company: &str, excluding_message_id: &str) -> Result<bool, DatabaseError> {
        self.has_company_elsewhere(company, excluding_message_id)
    }

    fn recorded_id(&self, message_id: &str) -> Result<Option<String>, DatabaseError> {
        processed_repo::find_record_id(&self.db, message_id)
    }
}

fn history_rows(records: &[&JobApplicationRecord], destination: &str) -> Vec<ProcessedMessageRow> {
    let processed_at = Utc::now().to_rfc3339();
    records
        .iter()
        .map(|record| ProcessedMessageRow {
            message_id: record.source_message_id.clone(),
            record_id: record.id.clone(),
            company: record.company.clone(),
            company_key: company_key(&record.company),
            destination: destination.to_string(),
            processed_at: processed_at.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerStats {
    pub total_processed: u64,
    pub companies: u64,
    /// `(destination, messages)` pairs, largest first.
    pub by_destination: Vec<(String, u64)>,
    pub last_processed_at: Option<String>,
}
