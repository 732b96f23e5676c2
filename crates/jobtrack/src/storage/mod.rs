//! Output stores and the primary/fallback sink.

pub mod csv_file;
pub mod sink;
pub mod sqlite;
pub mod tracker;

use rusqlite::Connection;

use crate::db::Database;
use crate::error::StoreError;
use crate::record::Row;

pub use csv_file::CsvFileStore;
pub use sink::{OutputSink, SinkDestination, SinkReport};
pub use sqlite::SqliteTableStore;
pub use tracker::{ProcessedTracker, TrackerStats};

/// An append-only store of rows in [`crate::record::COLUMNS`] order.
pub trait TabularStore {
    /// Human-readable name used in reports and the dedup history.
    fn name(&self) -> String;

    /// Appends `rows` in order. A failed call may have written nothing
    /// or everything, never a reordered subset.
    fn append_rows(&self, rows: &[Row]) -> Result<(), StoreError>;
}

/// The preferred store, which has a destination to locate or create.
pub trait PrimaryStore: TabularStore {
    /// Locates or creates the destination. Safe to call on every run.
    fn ensure_destination(&self) -> Result<DestinationHandle, StoreError>;

    /// Appends `rows` on `conn`, an open transaction of `db`, so they
    /// commit together with the dedup history. Returns `None` when the
    /// store does not live in `db`.
    ///
    /// A store backed by the dedup database must implement this: its
    /// plain [`TabularStore::append_rows`] would wait on the locked
    /// connection.
    fn append_rows_within(
        &self,
        _db: &Database,
        _conn: &Connection,
        _rows: &[Row],
    ) -> Option<Result<(), StoreError>> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationHandle {
    pub name: String,
    /// `true` when this call created the destination.
    pub created: bool,
}
