//! SQLite-based local storage.
//!
//! Provides persistent storage for:
//! - Completed deep work sessions (see `sessions.rs`)
//! - Key-value store for the timer snapshot, settings and backup counters

use std::path::Path;

use rusqlite::{params, Connection};

use super::data_dir;
use super::kv::KeyValueStore;
use super::migrations;
use crate::error::{CoreError, Result, StorageError};

/// SQLite database for session and application state storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/deepwork.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("deepwork.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| CoreError::from(StorageError::MigrationFailed(e.to_string())))?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
        db.kv_remove("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn open_at_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepwork.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
