//! Item slot contract with SQLite and in-memory implementations.
//!
//! # Responsibility
//! - Read and replace the serialized item list under one slot key.
//!
//! # Invariants
//! - `read` returns `None` when the slot was never written.
//! - `write` is last-write-wins.

use crate::db::{open_db, open_db_in_memory, DbError};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage key used by the original app for the item list.
pub const DEFAULT_SLOT_KEY: &str = "items";

const MAX_SLOT_KEY_CHARS: usize = 128;
static SLOT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").expect("valid slot key regex"));

pub type SlotResult<T> = Result<T, SlotError>;

/// Failure while reading or writing a slot.
#[derive(Debug)]
pub enum SlotError {
    Db(DbError),
    InvalidKey(String),
    /// The background save worker is gone.
    WorkerStopped,
    /// Backend-specific failure reported by a custom slot.
    Backend(String),
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid slot key `{key}`"),
            Self::WorkerStopped => write!(f, "persistence worker stopped"),
            Self::Backend(message) => write!(f, "slot backend failure: {message}"),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SlotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether `key` is an acceptable slot key.
pub fn is_valid_slot_key(key: &str) -> bool {
    key.chars().count() <= MAX_SLOT_KEY_CHARS && SLOT_KEY_RE.is_match(key)
}

/// Single opaque storage cell for the serialized item list.
///
/// Implementations are moved onto the persistence worker thread.
pub trait ItemSlot: Send {
    fn read(&mut self) -> SlotResult<Option<String>>;
    fn write(&mut self, payload: &str) -> SlotResult<()>;
}

/// SQLite-backed slot stored in the `kv_slots` table.
pub struct SqliteItemSlot {
    conn: Connection,
    slot_key: String,
}

impl SqliteItemSlot {
    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection, slot_key: impl Into<String>) -> SlotResult<Self> {
        let slot_key = slot_key.into();
        if !is_valid_slot_key(&slot_key) {
            return Err(SlotError::InvalidKey(slot_key));
        }
        Ok(Self { conn, slot_key })
    }

    /// Opens the slot database file at `path`.
    pub fn open(path: impl AsRef<Path>, slot_key: impl Into<String>) -> SlotResult<Self> {
        Self::try_new(open_db(path)?, slot_key)
    }

    /// Opens a throwaway in-memory slot database.
    pub fn open_in_memory(slot_key: impl Into<String>) -> SlotResult<Self> {
        Self::try_new(open_db_in_memory()?, slot_key)
    }
}

impl ItemSlot for SqliteItemSlot {
    fn read(&mut self) -> SlotResult<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM kv_slots WHERE slot_key = ?1;",
                [self.slot_key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn write(&mut self, payload: &str) -> SlotResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (slot_key, payload, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(slot_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![self.slot_key.as_str(), payload],
        )?;
        Ok(())
    }
}

/// In-memory slot; clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct MemoryItemSlot {
    cell: Arc<Mutex<Option<String>>>,
}

impl MemoryItemSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot pre-filled with `payload`.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    /// Returns the currently stored payload.
    pub fn payload(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ItemSlot for MemoryItemSlot {
    fn read(&mut self) -> SlotResult<Option<String>> {
        Ok(self.lock().clone())
    }

    fn write(&mut self, payload: &str) -> SlotResult<()> {
        *self.lock() = Some(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_slot_key, ItemSlot, MemoryItemSlot, SlotError, SqliteItemSlot};

    #[test]
    fn slot_key_validation() {
        assert!(is_valid_slot_key("items"));
        assert!(is_valid_slot_key("todo:items.v1"));
        assert!(!is_valid_slot_key(""));
        assert!(!is_valid_slot_key("has space"));
        assert!(!is_valid_slot_key(&"k".repeat(129)));
    }

    #[test]
    fn sqlite_slot_reads_none_until_written_and_overwrites() {
        let mut slot = SqliteItemSlot::open_in_memory("items").unwrap();
        assert_eq!(slot.read().unwrap(), None);

        slot.write("[]").unwrap();
        slot.write("[{\"key\":1,\"text\":\"a\",\"complete\":false}]")
            .unwrap();
        assert_eq!(
            slot.read().unwrap().as_deref(),
            Some("[{\"key\":1,\"text\":\"a\",\"complete\":false}]")
        );
    }

    #[test]
    fn sqlite_slot_rejects_invalid_key() {
        let err = SqliteItemSlot::open_in_memory("bad key").err().unwrap();
        assert!(matches!(err, SlotError::InvalidKey(key) if key == "bad key"));
    }

    #[test]
    fn memory_slot_clones_share_payload() {
        let slot = MemoryItemSlot::new();
        let mut writer = slot.clone();
        writer.write("[]").unwrap();
        assert_eq!(slot.payload().as_deref(), Some("[]"));
    }
}
