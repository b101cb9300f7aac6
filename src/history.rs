//! Session history: completed summaries in SQLite.
//!
//! Only summaries are stored. Counter state is per-session and dies with the
//! session; the history exists so the CLI can answer "how did the last few
//! runs go" without keeping anything live.

use crate::app_dirs::AppDirs;
use crate::session::SessionSummary;
use crate::signal::Dialect;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::{Path, PathBuf};

/// One completed session as recorded in history.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub started_at: DateTime<Local>,
    pub dialect: Dialect,
    pub reps: u32,
    pub duration_secs: f64,
    pub frames_observed: u32,
    pub frames_skipped: u32,
    pub degraded: bool,
}

/// Database manager for session history
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the history database under the state dir.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::history_db_path().unwrap_or_else(|| PathBuf::from("repkit_history.db"));
        Self::open_at(&db_path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                dialect TEXT NOT NULL,
                reps INTEGER NOT NULL,
                duration_secs REAL NOT NULL,
                frames_observed INTEGER NOT NULL,
                frames_skipped INTEGER NOT NULL,
                degraded BOOLEAN NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    /// Record a completed session.
    pub fn record(&self, started_at: DateTime<Local>, summary: &SessionSummary) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (started_at, dialect, reps, duration_secs, frames_observed, frames_skipped, degraded)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                started_at.to_rfc3339(),
                summary.dialect.to_string(),
                summary.reps,
                summary.duration_secs,
                summary.frames_observed,
                summary.frames_skipped,
                summary.reliability.is_degraded(),
            ],
        )?;

        Ok(())
    }

    /// Most recent sessions, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT started_at, dialect, reps, duration_secs, frames_observed, frames_skipped, degraded
            FROM sessions
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;

        let record_iter = stmt.query_map([limit as i64], Self::row_to_record)?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    /// Total reps across all recorded sessions.
    pub fn total_reps(&self) -> Result<u64> {
        let total: Option<i64> = self
            .conn
            .query_row("SELECT SUM(reps) FROM sessions", [], |row| row.get(0))?;
        Ok(total.unwrap_or(0) as u64)
    }

    /// The session with the most reps, if any were recorded.
    pub fn best_session(&self) -> Result<Option<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT started_at, dialect, reps, duration_secs, frames_observed, frames_skipped, degraded
            FROM sessions
            ORDER BY reps DESC, started_at ASC
            LIMIT 1
            "#,
        )?;

        let mut record_iter = stmt.query_map([], Self::row_to_record)?;
        record_iter.next().transpose()
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<SessionRecord> {
        let started_at_str: String = row.get(0)?;
        let started_at = DateTime::parse_from_rfc3339(&started_at_str)
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    0,
                    "started_at".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?
            .with_timezone(&Local);

        let dialect_str: String = row.get(1)?;
        let dialect = Dialect::from_name(&dialect_str).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                1,
                "dialect".to_string(),
                rusqlite::types::Type::Text,
            )
        })?;

        Ok(SessionRecord {
            started_at,
            dialect,
            reps: row.get(2)?,
            duration_secs: row.get(3)?,
            frames_observed: row.get(4)?,
            frames_skipped: row.get(5)?,
            degraded: row.get(6)?,
        })
    }
}
