//! Append-only tracker table: `destinations` and `applications`.

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::record::Row;

use super::{Database, DatabaseError};

/// Registers a destination. Returns `true` if it was newly created.
pub fn ensure_destination(db: &Database, name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO destinations (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    })
}

pub fn destination_exists(db: &Database, name: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| destination_exists_with(conn, name))
}

pub fn destination_exists_with(conn: &Connection, name: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM destinations WHERE name = ?1",
        params![name],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Appends rows in order within one transaction; either all rows land or none.
pub fn append_rows(db: &Database, destination: &str, rows: &[Row]) -> Result<(), DatabaseError> {
    db.with_transaction(|conn| append_rows_with(conn, destination, rows))
}

/// [`append_rows`] on a connection whose transaction the caller owns.
pub fn append_rows_with(
    conn: &Connection,
    destination: &str,
    rows: &[Row],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO applications
            (destination, company, position, application_date, status,
             source_message_id, email_date, source, notes, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for row in rows {
        stmt.execute(params![
            destination,
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            row[5],
            row[6],
            row[7],
            row[8],
        ])?;
    }
    Ok(())
}

/// All rows of a destination in append order.
pub fn list_rows(db: &Database, destination: &str) -> Result<Vec<Row>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT company, position, application_date, status, source_message_id,
                    email_date, source, notes, last_updated
             FROM applications WHERE destination = ?1 ORDER BY row_id ASC",
        )?;
        let rows = stmt
            .query_map(params![destination], |r| {
                Ok([
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                    r.get(6)?,
                    r.get(7)?,
                    r.get(8)?,
                ])
            })?
            .collect::<Result<Vec<Row>, _>>()?;
        Ok(rows)
    })
}

pub fn count_rows(db: &Database, destination: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM applications WHERE destination = ?1",
            params![destination],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
