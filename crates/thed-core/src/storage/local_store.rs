//! SQLite-backed gateway.
//!
//! Provides persistent storage for:
//! - Tasks, keyed by a store-assigned UUID
//! - Profiles (identity fields plus streak/star stats)
//! - Key-value store for the signed-in session
//!
//! This is the gateway the CLI runs against; any remote backend implementing
//! [`SyncGateway`] can replace it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, GatewayError};
use crate::gateway::{ProfileRecord, SessionInfo, SyncGateway, TaskPatch, TaskRecord};

const SESSION_KEY: &str = "session";

const TASK_COLUMNS: &str = "id, user_id, title, description, time_slot, status, is_routine, \
     is_personal, is_daily, created_at, unlock_at, timer_minutes, timer_started_at";

/// SQLite store implementing [`SyncGateway`].
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open the store at `~/.config/thed/thed.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("thed.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for tests).
    pub fn open_memory() -> Result<Self, GatewayError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, GatewayError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, GatewayError> {
        self.conn
            .lock()
            .map_err(|_| GatewayError::Store("connection mutex poisoned".into()))
    }

    fn migrate(&self) -> Result<(), GatewayError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id               TEXT PRIMARY KEY,
                user_id          TEXT NOT NULL,
                title            TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                time_slot        TEXT NOT NULL DEFAULT '',
                status           TEXT NOT NULL,
                is_routine       INTEGER NOT NULL DEFAULT 0,
                is_personal      INTEGER NOT NULL DEFAULT 0,
                is_daily         INTEGER NOT NULL DEFAULT 0,
                created_at       INTEGER NOT NULL,
                unlock_at        INTEGER,
                timer_minutes    INTEGER,
                timer_started_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS profiles (
                id                    TEXT PRIMARY KEY,
                name                  TEXT,
                profiles_list         TEXT NOT NULL DEFAULT '[]',
                has_onboarded         INTEGER NOT NULL DEFAULT 0,
                stars                 INTEGER NOT NULL DEFAULT 0,
                streak                INTEGER NOT NULL DEFAULT 0,
                total_stars           INTEGER NOT NULL DEFAULT 0,
                completed_today       INTEGER NOT NULL DEFAULT 0,
                current_day_timestamp INTEGER NOT NULL DEFAULT 0,
                last_cycle_timestamp  INTEGER NOT NULL DEFAULT 0,
                thresholds            TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_user_created ON tasks(user_id, created_at);",
        )?;
        Ok(())
    }

    /// Sign in by email. The user id is the base64 of the address.
    pub fn sign_in(&self, email: &str) -> Result<SessionInfo, GatewayError> {
        let email = email.trim();
        let session = SessionInfo {
            user_id: base64::engine::general_purpose::STANDARD.encode(email),
            email: email.to_string(),
        };
        let value = serde_json::to_string(&session)?;
        self.conn()?.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SESSION_KEY, value],
        )?;
        debug!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    pub fn sign_out(&self) -> Result<(), GatewayError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![SESSION_KEY])?;
        Ok(())
    }

    fn row_to_task(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
        Ok(TaskRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            time_slot: row.get(4)?,
            status: row.get(5)?,
            is_routine: row.get(6)?,
            is_personal: row.get(7)?,
            is_daily: row.get(8)?,
            created_at: row.get(9)?,
            unlock_at: row.get(10)?,
            timer_minutes: row.get(11)?,
            timer_started_at: row.get(12)?,
        })
    }
}

#[async_trait]
impl SyncGateway for LocalStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_session(&self) -> Result<Option<SessionInfo>, GatewayError> {
        let value: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|v| serde_json::from_str(&v).map_err(GatewayError::from))
            .transpose()
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>, GatewayError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, profiles_list, has_onboarded, stars, streak, total_stars,
                        completed_today, current_day_timestamp, last_cycle_timestamp, thresholds
                 FROM profiles WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        ProfileRecord {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            profiles_list: Vec::new(),
                            has_onboarded: row.get(3)?,
                            stars: row.get(4)?,
                            streak: row.get(5)?,
                            total_stars: row.get(6)?,
                            completed_today: row.get(7)?,
                            current_day_timestamp: row.get(8)?,
                            last_cycle_timestamp: row.get(9)?,
                            thresholds: Vec::new(),
                        },
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(mut record, tags, thresholds)| {
            record.profiles_list = serde_json::from_str(&tags)?;
            record.thresholds = serde_json::from_str(&thresholds)?;
            Ok::<_, GatewayError>(record)
        })
        .transpose()
    }

    async fn load_tasks(&self, user_id: &str) -> Result<Vec<TaskRecord>, GatewayError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![user_id], Self::row_to_task)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn insert_task(&self, record: TaskRecord) -> Result<TaskRecord, GatewayError> {
        let record = TaskRecord {
            id: Uuid::new_v4().to_string(),
            ..record
        };
        self.conn()?.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                record.id,
                record.user_id,
                record.title,
                record.description,
                record.time_slot,
                record.status,
                record.is_routine,
                record.is_personal,
                record.is_daily,
                record.created_at,
                record.unlock_at,
                record.timer_minutes,
                record.timer_started_at,
            ],
        )?;
        Ok(record)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<(), GatewayError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tasks SET status = COALESCE(?2, status) WHERE id = ?1",
            params![id, patch.status],
        )?;
        if changed == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), GatewayError> {
        self.conn()?
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn upsert_profile(&self, record: ProfileRecord) -> Result<(), GatewayError> {
        let tags = serde_json::to_string(&record.profiles_list)?;
        let thresholds = serde_json::to_string(&record.thresholds)?;
        self.conn()?.execute(
            "INSERT INTO profiles (id, name, profiles_list, has_onboarded, stars, streak,
                                   total_stars, completed_today, current_day_timestamp,
                                   last_cycle_timestamp, thresholds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                profiles_list = excluded.profiles_list,
                has_onboarded = excluded.has_onboarded,
                stars = excluded.stars,
                streak = excluded.streak,
                total_stars = excluded.total_stars,
                completed_today = excluded.completed_today,
                current_day_timestamp = excluded.current_day_timestamp,
                last_cycle_timestamp = excluded.last_cycle_timestamp,
                thresholds = excluded.thresholds",
            params![
                record.id,
                record.name,
                tags,
                record.has_onboarded,
                record.stars,
                record.streak,
                record.total_stars,
                record.completed_today,
                record.current_day_timestamp,
                record.last_cycle_timestamp,
                thresholds,
            ],
        )?;
        Ok(())
    }
}
