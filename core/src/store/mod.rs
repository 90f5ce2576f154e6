//! SQLite persistence layer, the host side of the engine boundary.
//!
//! RULE: Only the store talks to the database.
//! The engine never executes SQL; it receives an InputSnapshot and
//! returns a BatchReport, which the store persists.

use crate::{
    engine::{BatchIssue, IssueKind},
    error::{CompError, CompResult},
    event::{CalcEvent, EventLogEntry},
    types::Month,
};
mod inputs;
mod metrics;
use rusqlite::{params, Connection, OptionalExtension};

pub struct CompStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// A calc_run row.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub year: i32,
    pub through_month: Month,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub providers_computed: i64,
    pub providers_skipped: i64,
}

impl CompStore {
    pub fn open(path: &str) -> CompResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CompResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CompResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_inputs.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_provider_metric.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        year: i32,
        through_month: Month,
        started_at: &str,
    ) -> CompResult<()> {
        self.conn.execute(
            "INSERT INTO calc_run (run_id, year, through_month, started_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, year, through_month, started_at],
        )?;
        Ok(())
    }

    pub fn complete_run(
        &self,
        run_id: &str,
        computed: usize,
        skipped: usize,
        completed_at: &str,
    ) -> CompResult<()> {
        self.conn.execute(
            "UPDATE calc_run
             SET completed_at = ?2, providers_computed = ?3, providers_skipped = ?4
             WHERE run_id = ?1",
            params![run_id, completed_at, computed as i64, skipped as i64],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> CompResult<Option<RunRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, year, through_month, started_at, completed_at,
                        providers_computed, providers_skipped
                 FROM calc_run WHERE run_id = ?1",
                params![run_id],
                |r| {
                    Ok(RunRecord {
                        run_id: r.get(0)?,
                        year: r.get(1)?,
                        through_month: r.get(2)?,
                        started_at: r.get(3)?,
                        completed_at: r.get(4)?,
                        providers_computed: r.get(5)?,
                        providers_skipped: r.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, run_id: &str, seq: u64, event: &CalcEvent) -> CompResult<()> {
        self.conn.execute(
            "INSERT INTO calc_event (run_id, seq, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seq as i64, event.type_name(), serde_json::to_string(event)?],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> CompResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, event_type, payload
             FROM calc_event WHERE run_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    seq: row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Issues ─────────────────────────────────────────────────

    pub fn insert_issue(&self, run_id: &str, issue: &BatchIssue) -> CompResult<()> {
        self.conn.execute(
            "INSERT INTO calc_issue (run_id, provider_id, month, kind, skipped, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                issue.provider_id,
                issue.month,
                issue.kind.as_str(),
                issue.skipped,
                issue.reason,
            ],
        )?;
        Ok(())
    }

    pub fn issues_for_run(&self, run_id: &str) -> CompResult<Vec<BatchIssue>> {
        let mut stmt = self.conn.prepare(
            "SELECT provider_id, month, kind, skipped, reason
             FROM calc_issue WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<Month>>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, bool>(3)?,
                    r.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(provider_id, month, kind, skipped, reason)| {
                let kind = IssueKind::parse(&kind).ok_or_else(|| {
                    CompError::Other(anyhow::anyhow!("unknown issue kind '{kind}' in calc_issue"))
                })?;
                Ok(BatchIssue { provider_id, month, kind, skipped, reason })
            })
            .collect()
    }
}
