use log::{debug, info};
use rusqlite::Connection;

use crate::db::{application_repo, Database};
use crate::error::StoreError;
use crate::record::Row;

use super::{DestinationHandle, PrimaryStore, TabularStore};

/// Primary store: a named destination in the SQLite `applications` table.
pub struct SqliteTableStore {
    db: Database,
    destination: String,
}

impl SqliteTableStore {
    pub fn new(db: Database, destination: impl Into<String>) -> Self {
        Self {
            db,
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// All rows in append order.
    pub fn rows(&self) -> Result<Vec<Row>, StoreError> {
        Ok(application_repo::list_rows(&self.db, &self.destination)?)
    }

    pub fn row_count(&self) -> Result<u64, StoreError> {
        Ok(application_repo::count_rows(&self.db, &self.destination)?)
    }

    fn unavailable(&self, reason: impl ToString) -> StoreError {
        StoreError::DestinationUnavailable {
            name: self.destination.clone(),
            reason: reason.to_string(),
        }
    }
}

impl TabularStore for SqliteTableStore {
    fn name(&self) -> String {
        self.destination.clone()
    }

    fn append_rows(&self, rows: &[Row]) -> Result<(), StoreError> {
        let exists = application_repo::destination_exists(&self.db, &self.destination)
            .map_err(|e| self.unavailable(e))?;
        if !exists {
            return Err(self.unavailable("destination has not been created"));
        }

        application_repo::append_rows(&self.db, &self.destination, rows)?;
        debug!("Appended {} row(s) to '{}'", rows.len(), self.destination);
        Ok(())
    }
}

impl PrimaryStore for SqliteTableStore {
    fn ensure_destination(&self) -> Result<DestinationHandle, StoreError> {
        let created = application_repo::ensure_destination(&self.db, &self.destination)
            .map_err(|e| self.unavailable(e))?;
        if created {
            info!("Created destination '{}'", self.destination);
        }
        Ok(DestinationHandle {
            name: self.destination.clone(),
            created,
        })
    }

    fn append_rows_within(
        &self,
        db: &Database,
        conn: &Connection,
        rows: &[Row],
    ) -> Option<Result<(), StoreError>> {
        if !self.db.shares_connection(db) {
            return None;
        }
        let result = application_repo::destination_exists_with(conn, &self.destination)
            .map_err(|e| self.unavailable(e))
            .and_then(|exists| {
                if !exists {
                    return Err(self.unavailable("destination has not been created"));
                }
                application_repo::append_rows_with(conn, &self.destination, rows)?;
                debug!(
                    "Appended {} row(s) to '{}' with the dedup history",
                    rows.len(),
                    self.destination
                );
                Ok(())
            });
        Some(result)
    }
}
