//! SQLite-backed snapshot storage.
//!
//! A single `kv` table holds one row per snapshot field, keyed by the same
//! names the overlay reads (`timerState`, `remainingSeconds`, ...).

use rusqlite::{params, Connection};

use super::{data_dir, Snapshot, SnapshotStore};
use crate::error::StorageError;
use crate::timer::Phase;

const KEY_TIMER_STATE: &str = "timerState";
const KEY_REMAINING: &str = "remainingSeconds";
const KEY_TOTAL: &str = "totalSeconds";
const KEY_PRESET: &str = "currentPreset";

/// SQLite database for the timer snapshot.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/tabtimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("tabtimer.db");
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn number(&self, key: &str) -> Result<u32, StorageError> {
        match self.kv_get(key)? {
            // Absent numeric fields read as 0 and get repaired on restore.
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| StorageError::Corrupt {
                key: key.to_string(),
                value: raw,
            }),
        }
    }
}

impl SnapshotStore for Database {
    fn load(&self) -> Result<Option<Snapshot>, StorageError> {
        let Some(raw_state) = self.kv_get(KEY_TIMER_STATE)? else {
            return Ok(None);
        };
        let timer_state = Phase::parse(&raw_state).ok_or_else(|| StorageError::Corrupt {
            key: KEY_TIMER_STATE.to_string(),
            value: raw_state.clone(),
        })?;
        Ok(Some(Snapshot {
            timer_state,
            remaining_seconds: self.number(KEY_REMAINING)?,
            total_seconds: self.number(KEY_TOTAL)?,
            current_preset: self.number(KEY_PRESET)?,
        }))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in [
            (KEY_TIMER_STATE, snapshot.timer_state.as_str().to_string()),
            (KEY_REMAINING, snapshot.remaining_seconds.to_string()),
            (KEY_TOTAL, snapshot.total_seconds.to_string()),
            (KEY_PRESET, snapshot.current_preset.to_string()),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
