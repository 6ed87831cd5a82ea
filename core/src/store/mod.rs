//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Scoring components receive plain values and never execute SQL.

use crate::error::{ScoreError, ScoreResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde::Serialize;

mod filings;
mod queries;
mod scoring;

pub use filings::NewAlert;
pub use queries::{FeatureSnapshotRow, RiskHistoryQuery, RiskScorePage, RiskScoreQuery, RiskScoreRow};

/// Canonical text format for stored timestamps (matches SQLite `datetime()`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct RiskStore {
    conn: Connection,
}

impl RiskStore {
    pub fn open(path: &str) -> ScoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("Opened risk store at {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ScoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ScoreResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    /// Run `f` inside a single transaction.
    /// Commits when `f` succeeds; any error rolls back every write it made.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> ScoreResult<T>) -> ScoreResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Parse a stored timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(value: &str) -> ScoreResult<DateTime<Utc>> {
    let text = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(ScoreError::InvalidTimestamp { value: value.to_string() })
}

/// Encode a value for a TEXT json column.
fn to_json_text<T: Serialize>(value: &T) -> ScoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_sqlite_and_iso_timestamps() {
        let a = parse_timestamp("2026-02-22 10:00:00").unwrap();
        let b = parse_timestamp("2026-02-22T10:00:00").unwrap();
        let c = parse_timestamp("2026-02-22T10:00:00Z").unwrap();
        let d = parse_timestamp("2026-02-22T12:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_eq!(a.hour(), 10);
        assert!(parse_timestamp("2026-02-22 10:00:00.250").is_ok());
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ScoreError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn migrate_is_idempotent() {
        let store = RiskStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.migrate().unwrap();
    }
}
