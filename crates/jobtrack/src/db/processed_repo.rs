//! Dedup history: the `processed_messages` table.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

/// One message whose record is durably stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMessageRow {
    pub message_id: String,
    pub record_id: String,
    pub company: String,
    pub company_key: String,
    /// Store that holds the row: the primary destination name or `fallback`.
    pub destination: String,
    pub processed_at: String,
}

/// Inserts all rows in one transaction. Already known ids are ignored.
pub fn insert_many(db: &Database, rows: &[ProcessedMessageRow]) -> Result<usize, DatabaseError> {
    db.with_transaction(|conn| insert_many_with(conn, rows))
}

/// [`insert_many`] on a connection whose transaction the caller owns.
pub fn insert_many_with(
    conn: &Connection,
    rows: &[ProcessedMessageRow],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for row in rows {
        inserted += insert_with(conn, row)?;
    }
    Ok(inserted)
}

fn insert_with(conn: &Connection, row: &ProcessedMessageRow) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO processed_messages
            (message_id, record_id, company, company_key, destination, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.message_id,
            row.record_id,
            row.company,
            row.company_key,
            row.destination,
            row.processed_at,
        ],
    )?;
    Ok(changed)
}

/// Returns the subset of `message_ids` already recorded.
pub fn find_processed_ids(
    db: &Database,
    message_ids: &[String],
) -> Result<HashSet<String>, DatabaseError> {
    if message_ids.is_empty() {
        return Ok(HashSet::new());
    }

    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT message_id FROM processed_messages WHERE message_id = ?1")?;
        let mut found = HashSet::new();
        for id in message_ids {
            let hit: Option<String> = stmt.query_row(params![id], |r| r.get(0)).optional()?;
            found.extend(hit);
        }
        Ok(found)
    })
}

pub fn find_record_id(db: &Database, message_id: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let record_id = conn
            .query_row(
                "SELECT record_id FROM processed_messages WHERE message_id = ?1",
                params![message_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(record_id)
    })
}

/// Whether a message other than `excluding_message_id` recorded this company.
pub fn company_recorded_elsewhere(
    db: &Database,
    company_key: &str,
    excluding_message_id: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM processed_messages
             WHERE company_key = ?1 AND message_id != ?2",
            params![company_key, excluding_message_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 =
            conn.query_row("SELECT COUNT(*) FROM processed_messages", [], |r| r.get(0))?;
        Ok(count)
    })
}

pub fn count_companies(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(DISTINCT company_key) FROM processed_messages",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Message counts per destination, largest first.
pub fn count_by_destination(db: &Database) -> Result<Vec<(String, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT destination, COUNT(*) AS n FROM processed_messages
             GROUP BY destination ORDER BY n DESC, destination ASC",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_last_processed_at(db: &Database) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let last = conn.query_row(
            "SELECT MAX(processed_at) FROM processed_messages",
            [],
            |r| r.get::<_, Option<String>>(0),
        )?;
        Ok(last)
    })
}
