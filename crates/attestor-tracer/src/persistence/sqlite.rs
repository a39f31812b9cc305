//! SQLite implementation of CheckpointStore.

use super::CheckpointStore;
use eyre::{eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, sync::Mutex};

/// SQLite-backed checkpoint, a single-row table.
pub struct SqliteCheckpoint {
    conn: Mutex<Connection>,
}

impl SqliteCheckpoint {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoint (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                block_number INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl CheckpointStore for SqliteCheckpoint {
    fn load_checkpoint(&self) -> Result<Option<u64>> {
        let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;

        let block: Option<i64> = conn
            .query_row("SELECT block_number FROM checkpoint WHERE id = 1", [], |row| row.get(0))
            .optional()?;

        Ok(block.map(|n| n as u64))
    }

    fn save_checkpoint(&self, block_number: u64) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {e}"))?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        conn.execute(
            "INSERT OR REPLACE INTO checkpoint (id, block_number, updated_at) VALUES (1, ?1, ?2)",
            params![block_number as i64, now as i64],
        )?;

        Ok(())
    }
}
