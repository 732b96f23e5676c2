//! SQLite persistence: the dedup history and the primary tracker table.
//!
//! All access goes through one `Mutex<Connection>`; SQLite serializes
//! writes anyway and a run is single-threaded.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod application_repo;
pub mod error;
pub mod migrations;
pub mod processed_repo;

pub use error::DatabaseError;

/// Database handle. Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path` and applies pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction, committing only if it succeeds.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        self.transaction(f)
    }

    /// [`Self::with_transaction`] for callers with their own error type.
    ///
    /// The connection stays locked until `f` returns, so `f` must not go
    /// through this `Database` again.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
        let value = f(&*tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(value)
    }

    /// Whether both handles share one connection.
    pub fn shares_connection(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}
