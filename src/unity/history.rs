//! SQLite journal of deploy and restore runs

use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

use super::error::{DeployError, Result};
use super::pipeline::{DeployReport, Status, StepRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    run_id      TEXT PRIMARY KEY,
    profile     TEXT NOT NULL,
    action      TEXT NOT NULL,
    started_at  INTEGER NOT NULL,
    finished_at INTEGER NOT NULL,
    status      TEXT NOT NULL,
    steps       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS runs_profile ON runs (profile, started_at);
";

/// A recorded run
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub run_id: String,
    pub profile: String,
    pub action: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub status: Status,
    pub steps: Vec<StepRecord>,
}

impl HistoryEntry {
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == Status::Failed)
    }
}

pub struct History {
    conn: Connection,
}

impl History {
    /// Open (and create if needed) the journal at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DeployError::io("create", parent, e))?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn record(&self, report: &DeployReport) -> Result<()> {
        let steps = serde_json::to_string(&report.steps)?;
        self.conn.execute(
            "INSERT INTO runs (run_id, profile, action, started_at, finished_at, status, steps)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.run_id,
                report.profile,
                report.action,
                report.started_at,
                report.finished_at,
                report.status().to_string(),
                steps,
            ],
        )?;
        Ok(())
    }

    /// Most recent runs first, optionally for one profile
    pub fn recent(&self, profile: Option<&str>, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, profile, action, started_at, finished_at, status, steps
             FROM runs
             WHERE ?1 IS NULL OR profile = ?1
             ORDER BY started_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![profile, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (run_id, profile, action, started_at, finished_at, status, steps) = row?;
            entries.push(HistoryEntry {
                run_id,
                profile,
                action,
                started_at,
                finished_at,
                status: status.parse().unwrap_or(Status::Failed),
                steps: serde_json::from_str(&steps)?,
            });
        }
        Ok(entries)
    }
}
