//! Persists an [`OutputBatch`] to the primary store, falling back to the
//! secondary store, and records what was written in the dedup history.

use std::collections::HashSet;

use log::{info, warn};
use tracing::info_span;

use crate::db::DatabaseError;
use crate::error::{SinkError, StoreError};
use crate::record::{JobApplicationRecord, OutputBatch, Row};

use super::tracker::ProcessedTracker;
use super::{PrimaryStore, TabularStore};

/// Where a batch ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkDestination {
    Primary { name: String },
    Fallback { name: String, primary_error: String },
    /// Every record was a duplicate; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub destination: SinkDestination,
    /// Source message ids whose rows were appended, in batch order.
    pub appended: Vec<String>,
    /// Source message ids skipped because they were already recorded.
    pub skipped: Vec<String>,
}

impl SinkReport {
    pub fn is_fallback(&self) -> bool {
        matches!(self.destination, SinkDestination::Fallback { .. })
    }

    /// Every message id that is now durably stored, newly or before.
    pub fn durable_ids(&self) -> Vec<String> {
        self.appended
            .iter()
            .chain(self.skipped.iter())
            .cloned()
            .collect()
    }
}

/// Why a staged write did not commit.
enum Attempt {
    Store(StoreError),
    History(DatabaseError),
}

impl From<DatabaseError> for Attempt {
    fn from(e: DatabaseError) -> Self {
        Attempt::History(e)
    }
}

pub struct OutputSink {
    primary: Box<dyn PrimaryStore>,
    secondary: Box<dyn TabularStore>,
    tracker: ProcessedTracker,
}

impl OutputSink {
    pub fn new(
        primary: Box<dyn PrimaryStore>,
        secondary: Box<dyn TabularStore>,
        tracker: ProcessedTracker,
    ) -> Self {
        Self {
            primary,
            secondary,
            tracker,
        }
    }

    pub fn tracker(&self) -> &ProcessedTracker {
        &self.tracker
    }

    /// Writes the records not yet recorded, primary first.
    ///
    /// A primary failure of any kind sends the whole batch to the
    /// secondary store. Only a secondary failure is an error.
    pub fn persist(&self, batch: &OutputBatch) -> Result<SinkReport, SinkError> {
        let _span = info_span!("persist", records = batch.len()).entered();

        let (fresh, skipped) = self.split_duplicates(batch)?;
        if fresh.is_empty() {
            info!("Nothing to append ({} duplicate(s))", skipped.len());
            return Ok(SinkReport {
                destination: SinkDestination::Unchanged,
                appended: Vec::new(),
                skipped,
            });
        }

        let rows: Vec<Row> = fresh.iter().map(|r| r.to_row()).collect();
        let destination = match self.write_primary(&fresh, &rows) {
            Ok(name) => {
                info!("Appended {} row(s) to primary '{}'", rows.len(), name);
                SinkDestination::Primary { name }
            }
            Err(Attempt::History(source)) => {
                return Err(SinkError::History {
                    destination: self.primary.name(),
                    source,
                });
            }
            Err(Attempt::Store(primary)) => {
                warn!("Primary store failed, using fallback: {}", primary);
                let name = self.secondary.name();
                let label = format!("fallback:{}", name);
                let written = self.tracker.record_with(&fresh, &label, |_, _| {
                    self.secondary.append_rows(&rows).map_err(Attempt::Store)
                });
                match written {
                    Ok(()) => {}
                    Err(Attempt::Store(secondary)) => {
                        return Err(SinkError::SecondaryStoreFailure { primary, secondary });
                    }
                    Err(Attempt::History(source)) => {
                        return Err(SinkError::History {
                            destination: label,
                            source,
                        });
                    }
                }
                info!("Appended {} row(s) to fallback '{}'", rows.len(), name);
                SinkDestination::Fallback {
                    name,
                    primary_error: primary.to_string(),
                }
            }
        };

        Ok(SinkReport {
            destination,
            appended: fresh.iter().map(|r| r.source_message_id.clone()).collect(),
            skipped,
        })
    }

    /// Appends to the primary while the history entries are staged. A
    /// primary in the tracker's database commits in the same transaction.
    fn write_primary(
        &self,
        fresh: &[&JobApplicationRecord],
        rows: &[Row],
    ) -> Result<String, Attempt> {
        let handle = self.primary.ensure_destination().map_err(Attempt::Store)?;
        self.tracker.record_with(fresh, &handle.name, |db, conn| {
            self.primary
                .append_rows_within(db, conn, rows)
                .unwrap_or_else(|| self.primary.append_rows(rows))
                .map_err(Attempt::Store)
        })?;
        Ok(handle.name)
    }

    /// Splits the batch into records to write and ids already recorded.
    /// A message repeated within the batch keeps its first record.
    fn split_duplicates<'a>(
        &self,
        batch: &'a OutputBatch,
    ) -> Result<(Vec<&'a JobApplicationRecord>, Vec<String>), SinkError> {
        let ids: Vec<String> = batch
            .iter()
            .map(|r| r.source_message_id.clone())
            .collect();
        let recorded = self
            .tracker
            .processed_ids(&ids)
            .map_err(SinkError::HistoryLookup)?;

        let mut seen = HashSet::new();
        let mut fresh = Vec::new();
        let mut skipped = Vec::new();
        for record in batch.iter() {
            let id = &record.source_message_id;
            if recorded.contains(id) {
                skipped.push(id.clone());
            } else if seen.insert(id.clone()) {
                fresh.push(record);
            } else {
                warn!("Message '{}' appears twice in one batch", id);
            }
        }
        Ok((fresh, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::record::Status;
    use crate::storage::{CsvFileStore, DestinationHandle, SqliteTableStore};
    use chrono::{NaiveDate, Utc};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default, Clone)]
    struct MemoryStore {
        rows: Arc<Mutex<Vec<Row>>>,
        fail: bool,
    }

    impl TabularStore for MemoryStore {
        fn name(&self) -> String {
            "memory".to_string()
        }

        fn append_rows(&self, rows: &[Row]) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Rejected("quota exceeded".to_string()));
            }
            self.rows.lock().unwrap().extend_from_slice(rows);
            Ok(())
        }
    }

    impl PrimaryStore for MemoryStore {
        fn ensure_destination(&self) -> Result<DestinationHandle, StoreError> {
            Ok(DestinationHandle {
                name: self.name(),
                created: false,
            })
        }
    }

    fn record(message_id: &str) -> JobApplicationRecord {
        JobApplicationRecord {
            id: format!("acme_engineer_{}", message_id),
            company: "Acme".to_string(),
            position: "Engineer".to_string(),
            status: Status::Applied,
            application_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            source_message_id: message_id.to_string(),
            email_date: "2024-01-15T10:00:00+00:00".to_string(),
            source: "Email (Pattern)".to_string(),
            notes: format!("Subject: {}", message_id),
            last_updated: Utc::now(),
        }
    }

    fn batch(ids: &[&str]) -> OutputBatch {
        ids.iter().map(|id| record(id)).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_primary_success() {
        let db = Database::open_in_memory().unwrap();
        let primary = MemoryStore::default();
        let secondary = MemoryStore::default();
        let sink = OutputSink::new(
            Box::new(primary.clone()),
            Box::new(secondary.clone()),
            ProcessedTracker::new(db),
        );

        let report = sink.persist(&batch(&["m1", "m2"])).unwrap();
        assert_eq!(
            report.destination,
            SinkDestination::Primary {
                name: "memory".to_string()
            }
        );
        assert_eq!(report.appended, vec!["m1", "m2"]);
        assert_eq!(primary.rows.lock().unwrap().len(), 2);
        assert!(secondary.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fallback_gets_identical_rows() {
        let db = Database::open_in_memory().unwrap();
        let secondary = MemoryStore::default();
        let sink = OutputSink::new(
            Box::new(MemoryStore {
                fail: true,
                ..Default::default()
            }),
            Box::new(secondary.clone()),
            ProcessedTracker::new(db),
        );

        let input = batch(&["m1", "m2", "m3"]);
        let report = sink.persist(&input).unwrap();
        assert!(report.is_fallback());
        assert_eq!(*secondary.rows.lock().unwrap(), input.to_rows());
        assert!(sink.tracker().is_processed("m2").unwrap());
    }

    #[test]
    fn test_both_stores_failing_is_fatal_and_unrecorded() {
        let db = Database::open_in_memory().unwrap();
        let failing = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let sink = OutputSink::new(
            Box::new(failing.clone()),
            Box::new(failing),
            ProcessedTracker::new(db),
        );

        let err = sink.persist(&batch(&["m1"])).unwrap_err();
        assert!(matches!(err, SinkError::SecondaryStoreFailure { .. }));
        assert!(!sink.tracker().is_processed("m1").unwrap());
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        let primary = MemoryStore::default();
        let sink = OutputSink::new(
            Box::new(primary.clone()),
            Box::new(MemoryStore::default()),
            ProcessedTracker::new(db),
        );

        sink.persist(&batch(&["m1"])).unwrap();
        let report = sink.persist(&batch(&["m1", "m2", "m2"])).unwrap();
        assert_eq!(report.appended, vec!["m2"]);
        assert_eq!(report.skipped, vec!["m1"]);
        assert_eq!(primary.rows.lock().unwrap().len(), 2);

        let report = sink.persist(&batch(&["m1", "m2"])).unwrap();
        assert_eq!(report.destination, SinkDestination::Unchanged);
        assert_eq!(report.durable_ids(), vec!["m1", "m2"]);
    }

    fn execute(db: &Database, sql: &str) {
        db.with_conn(|conn| Ok(conn.execute_batch(sql)?)).unwrap();
    }

    const BLOCK_HISTORY: &str = "CREATE TRIGGER block_history BEFORE INSERT ON processed_messages
         BEGIN SELECT RAISE(ABORT, 'history offline'); END;";

    #[test]
    fn test_history_failure_leaves_no_rows_behind() {
        let db = Database::open_in_memory().unwrap();
        let primary = SqliteTableStore::new(db.clone(), "Tracker");
        let sink = OutputSink::new(
            Box::new(SqliteTableStore::new(db.clone(), "Tracker")),
            Box::new(MemoryStore::default()),
            ProcessedTracker::new(db.clone()),
        );

        execute(&db, BLOCK_HISTORY);
        let err = sink.persist(&batch(&["m1"])).unwrap_err();
        assert!(matches!(err, SinkError::History { .. }));
        assert_eq!(primary.row_count().unwrap(), 0);

        // Once history works again the batch lands exactly once.
        execute(&db, "DROP TRIGGER block_history;");
        sink.persist(&batch(&["m1"])).unwrap();
        sink.persist(&batch(&["m1"])).unwrap();
        assert_eq!(primary.row_count().unwrap(), 1);
        assert!(sink.tracker().is_processed("m1").unwrap());
    }

    #[test]
    fn test_history_failure_on_fallback_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let secondary = MemoryStore::default();
        let sink = OutputSink::new(
            Box::new(MemoryStore {
                fail: true,
                ..Default::default()
            }),
            Box::new(secondary.clone()),
            ProcessedTracker::new(db.clone()),
        );

        execute(
            &db,
            "CREATE TRIGGER block_fallback_history BEFORE INSERT ON processed_messages
             WHEN NEW.destination LIKE 'fallback:%'
             BEGIN SELECT RAISE(ABORT, 'history offline'); END;",
        );
        let err = sink.persist(&batch(&["m1", "m2"])).unwrap_err();
        assert!(matches!(
            err,
            SinkError::History { ref destination, .. } if destination == "fallback:memory"
        ));
        assert!(secondary.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_primary_append_rolls_back_its_history() {
        let db = Database::open_in_memory().unwrap();
        let secondary = MemoryStore::default();
        let sink = OutputSink::new(
            Box::new(SqliteTableStore::new(db.clone(), "Tracker")),
            Box::new(secondary.clone()),
            ProcessedTracker::new(db.clone()),
        );

        execute(
            &db,
            "CREATE TRIGGER block_rows BEFORE INSERT ON applications
             BEGIN SELECT RAISE(ABORT, 'table locked'); END;",
        );
        let report = sink.persist(&batch(&["m1"])).unwrap();
        assert!(report.is_fallback());
        assert_eq!(secondary.rows.lock().unwrap().len(), 1);

        let stats = sink.tracker().stats().unwrap();
        assert_eq!(stats.by_destination, vec![("fallback:memory".to_string(), 1)]);
    }

    #[test]
    fn test_sqlite_primary_and_csv_secondary() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let csv_path = dir.path().join("fallback.csv");
        let sink = OutputSink::new(
            Box::new(SqliteTableStore::new(db.clone(), "Tracker")),
            Box::new(CsvFileStore::new(&csv_path)),
            ProcessedTracker::new(db.clone()),
        );

        sink.persist(&batch(&["m1"])).unwrap();
        assert_eq!(
            SqliteTableStore::new(db, "Tracker").row_count().unwrap(),
            1
        );
        assert!(!csv_path.exists());
    }
}
