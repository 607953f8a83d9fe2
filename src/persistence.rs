//! SQLite persistence layer for the settings and session records.
//!
//! Each record is stored as a JSON document under its own key, so the two
//! can be read and written independently.

use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Key of the settings record.
pub const SETTINGS_KEY: &str = "pomodoro-settings";
/// Key of the session log record.
pub const SESSIONS_KEY: &str = "pomodoro-sessions";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory")]
    DirectoryCreation,
    #[error("Database connection lock was poisoned")]
    Poisoned,
}

/// Handle to the record store.
///
/// Cloning is cheap and every clone talks to the same connection, which lets
/// the settings store and the session log each hold their own handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens the database at the default per-user location.
    pub fn new() -> Result<Self, DatabaseError> {
        Self::open(Self::db_path())
    }

    /// Opens (or creates) a database file at `path`, initializing tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();

        // Ensure directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Creates an in-memory database. Nothing survives the process.
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        Self::initialize_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Default location of the database file.
    pub fn db_path() -> PathBuf {
        ProjectDirs::from("com", "pomode", "Pomode")
            .map(|dirs| dirs.data_dir().join("pomode.db"))
            .unwrap_or_else(|| PathBuf::from("pomode.db"))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Reads the raw text stored under `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row("SELECT value FROM store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Writes raw text under `key`, replacing any previous value.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO store (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    /// Loads and parses the JSON document under `key`, if any.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serializes `value` as JSON and stores it under `key`.
    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(value)?;
        self.put_raw(key, &json)
    }

    /// Deletes the record under `key`.
    pub fn remove(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn()?.execute("DELETE FROM store WHERE key = ?", [key])?;
        Ok(())
    }
}
