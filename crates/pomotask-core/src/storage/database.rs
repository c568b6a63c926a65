//! SQLite-based task, session and interruption storage.
//!
//! Provides persistent storage for:
//! - The local task list used when a timer starts without a task
//! - Finished phases (completed or skipped)
//! - Interruption notes
//! - Statistics (daily and all-time)

use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_dir;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::events::{CompletedSession, Interruption};
use crate::recorder::SessionRecorder;
use crate::task::{Task, TaskSource};
use crate::timer::{Phase, SessionId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub completed_work_sessions: u64,
    pub skipped_work_sessions: u64,
    pub focus_min: u64,
    pub break_min: u64,
    pub long_breaks: u64,
    pub interruptions: u64,
}

/// SQLite database for tasks and session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/pomotask.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pomotask.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                done        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id    TEXT NOT NULL,
                task_id       TEXT,
                phase         TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                skipped       INTEGER NOT NULL DEFAULT 0,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS interruptions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id     TEXT NOT NULL,
                task_id        TEXT,
                phase          TEXT NOT NULL,
                remaining_secs INTEGER NOT NULL,
                note           TEXT,
                at             TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_interruptions_at ON interruptions(at);",
        )?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn add_task(&self, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("title".into()).into());
        }
        let task = Task::new(title);
        self.conn.execute(
            "INSERT INTO tasks (id, title, created_at, done) VALUES (?1, ?2, ?3, 0)",
            params![task.id, task.title, task.created_at.to_rfc3339()],
        )?;
        Ok(task)
    }

    /// Tasks in creation order.
    pub fn list_tasks(&self, include_done: bool) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, created_at, done FROM tasks
             WHERE done = 0 OR ?1
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map(params![include_done], |row| {
            Ok(Task {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: parse_ts(&row.get::<_, String>(2)?),
                done: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn complete_task(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("UPDATE tasks SET done = 1 WHERE id = ?1", params![id])?;
        ensure_found(changed, id)
    }

    pub fn remove_task(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        ensure_found(changed, id)
    }

    /// Oldest task that is not done.
    pub fn first_open_task(&self) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM tasks WHERE done = 0 ORDER BY created_at, rowid LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn insert_completion(&self, session: &CompletedSession) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (session_id, task_id, phase, duration_secs, skipped, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.session_id.to_string(),
                session.task_id,
                session.phase.as_str(),
                session.duration_secs,
                session.skipped,
                session.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_interruption(&self, interruption: &Interruption) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO interruptions (session_id, task_id, phase, remaining_secs, note, at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                interruption.session_id.to_string(),
                interruption.task_id,
                interruption.phase.as_str(),
                interruption.remaining_secs,
                interruption.note,
                interruption.at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent interruptions first.
    pub fn list_interruptions(&self, limit: usize) -> Result<Vec<Interruption>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, task_id, phase, remaining_secs, note, at
             FROM interruptions
             ORDER BY at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (session_id, task_id, phase, remaining_secs, note, at) = row?;
            let Ok(session_id) = session_id.parse::<SessionId>() else {
                warn!(%session_id, "skipping interruption with malformed session id");
                continue;
            };
            out.push(Interruption {
                session_id,
                task_id,
                phase: Phase::parse(&phase).unwrap_or(Phase::Idle),
                remaining_secs,
                note,
                at: parse_ts(&at),
            });
        }
        Ok(out)
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Statistics since local midnight.
    pub fn stats_today(&self) -> Result<Stats> {
        let midnight = Local::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        self.stats_since(Some(midnight))
    }

    pub fn stats_all(&self) -> Result<Stats> {
        self.stats_since(None)
    }

    fn stats_since(&self, since: Option<DateTime<Utc>>) -> Result<Stats> {
        // RFC 3339 strings in UTC compare in time order.
        let since = since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| String::from("0000"));

        let mut stmt = self.conn.prepare(
            "SELECT phase, skipped, COUNT(*), COALESCE(SUM(duration_secs), 0)
             FROM sessions
             WHERE completed_at >= ?1
             GROUP BY phase, skipped",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut stats = Stats::default();
        let mut focus_secs = 0;
        let mut break_secs = 0;
        for row in rows {
            let (phase, skipped, count, secs) = row?;
            match Phase::parse(&phase) {
                Some(Phase::Work) => {
                    if skipped {
                        stats.skipped_work_sessions += count;
                    } else {
                        stats.completed_work_sessions += count;
                    }
                    focus_secs += secs;
                }
                Some(p @ (Phase::ShortBreak | Phase::LongBreak)) => {
                    if p == Phase::LongBreak {
                        stats.long_breaks += count;
                    }
                    break_secs += secs;
                }
                _ => {}
            }
        }
        stats.focus_min = focus_secs / 60;
        stats.break_min = break_secs / 60;

        stats.interruptions = self.conn.query_row(
            "SELECT COUNT(*) FROM interruptions WHERE at >= ?1",
            params![since],
            |row| row.get::<_, u64>(0),
        )?;
        Ok(stats)
    }
}

impl TaskSource for Database {
    fn first_available(&self) -> Option<String> {
        match self.first_open_task() {
            Ok(task) => task,
            Err(err) => {
                warn!(error = %err, "failed to look up fallback task");
                None
            }
        }
    }
}

impl SessionRecorder for Database {
    fn record_interruption(&mut self, interruption: &Interruption) -> Result<()> {
        self.insert_interruption(interruption).map(|_| ())
    }

    fn record_completion(&mut self, session: &CompletedSession) -> Result<()> {
        self.insert_completion(session).map(|_| ())
    }
}

fn ensure_found(changed: usize, id: &str) -> Result<()> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            kind: "task",
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn completion(phase: Phase, secs: u32, skipped: bool) -> CompletedSession {
        CompletedSession {
            session_id: SessionId::new(),
            task_id: Some("t".into()),
            phase,
            duration_secs: secs,
            skipped,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn tasks_fall_back_in_creation_order() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.first_available(), None);
        let first = db.add_task("Write report").unwrap();
        let second = db.add_task("Review PR").unwrap();
        assert_eq!(db.first_available(), Some(first.id.clone()));

        db.complete_task(&first.id).unwrap();
        assert_eq!(db.first_available(), Some(second.id));
        assert_eq!(db.list_tasks(false).unwrap().len(), 1);
        assert_eq!(db.list_tasks(true).unwrap().len(), 2);
    }

    #[test]
    fn blank_titles_are_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(db.add_task("  "), Err(CoreError::Validation(_))));
    }

    #[test]
    fn unknown_task_ids_are_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.remove_task("missing"),
            Err(CoreError::Database(DatabaseError::NotFound { .. }))
        ));
    }

    #[test]
    fn stats_split_completed_and_skipped() {
        let db = Database::open_memory().unwrap();
        db.insert_completion(&completion(Phase::Work, 1500, false)).unwrap();
        db.insert_completion(&completion(Phase::Work, 600, true)).unwrap();
        db.insert_completion(&completion(Phase::ShortBreak, 300, false)).unwrap();
        db.insert_completion(&completion(Phase::LongBreak, 900, false)).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.completed_work_sessions, 1);
        assert_eq!(stats.skipped_work_sessions, 1);
        assert_eq!(stats.focus_min, 35);
        assert_eq!(stats.break_min, 20);
        assert_eq!(stats.long_breaks, 1);
        assert_eq!(db.stats_today().unwrap(), stats);
    }

    #[test]
    fn interruptions_round_trip_newest_first() {
        let mut db = Database::open_memory().unwrap();
        for note in ["first", "second"] {
            db.record_interruption(&Interruption {
                session_id: SessionId::new(),
                task_id: Some("t".into()),
                phase: Phase::Work,
                remaining_secs: 100,
                note: Some(note.into()),
                at: Utc::now(),
            })
            .unwrap();
        }
        let listed = db.list_interruptions(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].note.as_deref(), Some("second"));
        assert_eq!(db.list_interruptions(1).unwrap().len(), 1);
        assert_eq!(db.list_interruptions(usize::MAX).unwrap().len(), 2);
        assert_eq!(db.stats_all().unwrap().interruptions, 2);
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomotask.db");
        let db = Database::open_at(&path).unwrap();
        db.add_task("persisted").unwrap();
        drop(db);
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.list_tasks(false).unwrap()[0].title, "persisted");
    }
}
