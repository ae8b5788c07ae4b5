//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The pipeline calls store methods; the engines never see a connection.

use crate::{error::PipelineResult, event::EventLogEntry, types::Timestamp};
pub mod classification;
pub mod reconstruction;
use rusqlite::{params, Connection, OptionalExtension};

pub struct AuditStore {
    conn: Connection,
}

/// One row of the `run` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub run_id:     String,
    pub version:    String,
    pub started_at: String,
    pub completed:  bool,
    pub failures:   i64,
}

impl AuditStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, started_at: &str) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, version, started_at],
        )?;
        Ok(())
    }

    pub fn complete_run(&self, run_id: &str, failures: usize) -> PipelineResult<()> {
        self.conn.execute(
            "UPDATE run SET completed = 1, failures = ?1 WHERE run_id = ?2",
            params![failures as i64, run_id],
        )?;
        Ok(())
    }

    /// Record the failure count of a run that stopped early. The run stays
    /// incomplete.
    pub fn abort_run(&self, run_id: &str, failures: usize) -> PipelineResult<()> {
        self.conn.execute(
            "UPDATE run SET completed = 0, failures = ?1 WHERE run_id = ?2",
            params![failures as i64, run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> PipelineResult<Option<RunRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, version, started_at, completed, failures
                 FROM run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRow {
                        run_id:     row.get(0)?,
                        version:    row.get(1)?,
                        started_at: row.get(2)?,
                        completed:  row.get::<_, i64>(3)? != 0,
                        failures:   row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, seq, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.seq as i64,
                entry.stage,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> PipelineResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    seq:        row.get::<_, i64>(2)? as u64,
                    stage:      row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count_events_of_type(&self, run_id: &str, event_type: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ── Column helpers ─────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_date(date: Timestamp) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored TEXT column back into a typed value, reporting the
/// column index on failure the way rusqlite does for its own conversions.
pub(crate) fn parse_column<T, E>(idx: usize, raw: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> rusqlite::Result<T>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    parse(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

pub(crate) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<Timestamp> {
    parse_column(idx, raw, |s| chrono::NaiveDate::parse_from_str(s, DATE_FORMAT))
}
