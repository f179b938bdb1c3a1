//! SQLite-backed collaborator.
//!
//! Stores habits and their day logs in two tables:
//! - `habits`: one row per habit
//! - `habit_logs`: one row per (habit, date), cascading on habit deletion
//!
//! This is the only place where row presence is turned into a day state;
//! a missing `habit_logs` row is how an empty day is represented.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::RemoteLogStore;
use crate::error::{RemoteError, Result};
use crate::habit::{parse_date, CommitStatus, DayLog, Habit, HabitId, DATE_FORMAT};
use crate::storage::data_dir;

const SCHEMA_VERSION: i32 = 1;

/// SQLite database standing in for the hosted backend.
pub struct SqliteRemote {
    conn: Mutex<Connection>,
}

impl SqliteRemote {
    /// Open the database at `<data dir>/seeme.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("seeme.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RemoteError> {
        self.conn
            .lock()
            .map_err(|_| RemoteError::Failure("database connection poisoned".into()))
    }

    fn load_habit(conn: &Connection, habit_id: &HabitId) -> Result<Habit, RemoteError> {
        let row = conn
            .query_row(
                "SELECT title, is_public FROM habits WHERE id = ?1",
                params![habit_id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()
            .map_err(map_sqlite_error)?;
        let (title, is_public) =
            row.ok_or_else(|| RemoteError::NotFound(format!("habit {habit_id}")))?;

        let mut stmt = conn
            .prepare("SELECT date, status FROM habit_logs WHERE habit_id = ?1")
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map(params![habit_id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(map_sqlite_error)?;

        let mut logs = Vec::new();
        for row in rows {
            let (date, status) = row.map_err(map_sqlite_error)?;
            logs.push(log_from_row(&date, &status)?);
        }

        Ok(Habit::new(habit_id.clone(), title, is_public).with_logs(logs))
    }
}

/// Apply all pending migrations.
fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )?;
    let current: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })?
        .unwrap_or(0);

    if current < 1 {
        migrate_v1(conn)?;
    }
    Ok(())
}

fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            is_public   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_logs (
            habit_id    TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            date        TEXT NOT NULL,
            status      TEXT NOT NULL CHECK (status IN ('committed', 'skipped')),
            PRIMARY KEY (habit_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_habits_created_at ON habits(created_at);",
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}

fn log_from_row(date: &str, status: &str) -> Result<DayLog, RemoteError> {
    let date = parse_date(date)
        .ok_or_else(|| RemoteError::Failure(format!("invalid date in habit_logs: '{date}'")))?;
    let status = status
        .parse::<CommitStatus>()
        .map_err(|e| RemoteError::Failure(e.to_string()))?;
    Ok(DayLog::new(date, status))
}

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Classify a SQLite error for the store.
fn map_sqlite_error(err: rusqlite::Error) -> RemoteError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) => {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => RemoteError::Conflict(detail),
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RemoteError::NotFound(detail),
                _ => RemoteError::Failure(detail),
            }
        }
        _ => RemoteError::Failure(err.to_string()),
    }
}

#[async_trait]
impl RemoteLogStore for SqliteRemote {
    async fn create_log(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<DayLog, RemoteError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO habit_logs (habit_id, date, status) VALUES (?1, ?2, ?3)",
            params![habit_id.as_str(), date_key(date), status.as_str()],
        )
        .map_err(map_sqlite_error)?;
        Ok(DayLog::new(date, status))
    }

    async fn update_log_status(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        status: CommitStatus,
    ) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE habit_logs SET status = ?3 WHERE habit_id = ?1 AND date = ?2",
                params![habit_id.as_str(), date_key(date), status.as_str()],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(RemoteError::NotFound(format!("log for {habit_id} on {date}")));
        }
        Ok(())
    }

    async fn delete_log(&self, habit_id: &HabitId, date: NaiveDate) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM habit_logs WHERE habit_id = ?1 AND date = ?2",
            params![habit_id.as_str(), date_key(date)],
        )
        .map_err(map_sqlite_error)?;
        Ok(())
    }

    async fn fetch_habit_with_logs(&self, habit_id: &HabitId) -> Result<Habit, RemoteError> {
        let conn = self.conn()?;
        Self::load_habit(&conn, habit_id)
    }

    async fn fetch_habits(&self) -> Result<Vec<Habit>, RemoteError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, title, is_public FROM habits
                 ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })
            .map_err(map_sqlite_error)?;
        let mut habits = Vec::new();
        for row in rows {
            let (id, title, is_public) = row.map_err(map_sqlite_error)?;
            habits.push(Habit::new(HabitId::from_string(&id), title, is_public));
        }

        let mut stmt = conn
            .prepare("SELECT habit_id, date, status FROM habit_logs")
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(map_sqlite_error)?;
        let mut logs: HashMap<String, Vec<DayLog>> = HashMap::new();
        for row in rows {
            let (habit_id, date, status) = row.map_err(map_sqlite_error)?;
            logs.entry(habit_id)
                .or_default()
                .push(log_from_row(&date, &status)?);
        }

        Ok(habits
            .into_iter()
            .map(|habit| {
                let owned = logs.remove(habit.id.as_str()).unwrap_or_default();
                habit.with_logs(owned)
            })
            .collect())
    }

    async fn create_habit(&self, title: &str, is_public: bool) -> Result<Habit, RemoteError> {
        let conn = self.conn()?;
        let habit = Habit::new(HabitId::new(), title, is_public);
        conn.execute(
            "INSERT INTO habits (id, title, is_public, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                habit.id.as_str(),
                habit.title,
                habit.is_public,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(habit)
    }

    async fn set_habit_visibility(
        &self,
        habit_id: &HabitId,
        is_public: bool,
    ) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE habits SET is_public = ?2 WHERE id = ?1",
                params![habit_id.as_str(), is_public],
            )
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(RemoteError::NotFound(format!("habit {habit_id}")));
        }
        Ok(())
    }

    async fn delete_habit(&self, habit_id: &HabitId) -> Result<(), RemoteError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM habits WHERE id = ?1",
            params![habit_id.as_str()],
        )
        .map_err(map_sqlite_error)?;
        Ok(())
    }
}
