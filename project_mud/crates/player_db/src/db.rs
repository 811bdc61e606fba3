use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use persistence::{PersistenceError, PlayerStore};
use rusqlite::{Connection, OptionalExtension};

use crate::error::PlayerDbError;
use crate::schema;

/// SQLite-backed player store. One row per player name.
pub struct PlayerDb {
    conn: Mutex<Connection>,
}

impl PlayerDb {
    /// Open (or create) a database at the given file path.
    pub fn open(path: &str) -> Result<Self, PlayerDbError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, PlayerDbError> {
        let conn = Connection::open_in_memory()?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored players.
    pub fn count(&self) -> Result<u64, PlayerDbError> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn get_record(&self, name: &str) -> Result<Option<Vec<u8>>, PlayerDbError> {
        let record = self
            .conn()
            .query_row(
                "SELECT record FROM players WHERE name = ?1",
                rusqlite::params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(record)
    }

    fn put_record(&self, name: &str, bytes: &[u8]) -> Result<(), PlayerDbError> {
        self.conn().execute(
            "INSERT INTO players (name, record) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET record = excluded.record, updated_at = datetime('now')",
            rusqlite::params![name, bytes],
        )?;
        Ok(())
    }

    fn create_record(&self, name: &str, bytes: &[u8]) -> Result<bool, PlayerDbError> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO players (name, record) VALUES (?1, ?2)",
            rusqlite::params![name, bytes],
        )?;
        Ok(rows == 1)
    }
}

impl PlayerStore for PlayerDb {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.get_record(key)?)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        tracing::debug!(player = key, len = bytes.len(), "Saving player record");
        Ok(self.put_record(key, bytes)?)
    }

    fn create(&self, key: &str, bytes: &[u8]) -> Result<bool, PersistenceError> {
        Ok(self.create_record(key, bytes)?)
    }
}
