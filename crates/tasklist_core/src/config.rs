//! Store configuration.
//!
//! # Responsibility
//! - Name the slot database file and the slot key.
//! - Reject unusable configuration before any I/O happens.

use crate::repo::slot_repo::{is_valid_slot_key, DEFAULT_SLOT_KEY};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// File name used by [`StoreConfig::in_dir`].
pub const DEFAULT_DB_FILE_NAME: &str = "tasklist.sqlite3";

/// Invalid store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    InvalidSlotKey(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::InvalidSlotKey(key) => write!(
                f,
                "slot_key `{key}` must be 1-128 chars of [A-Za-z0-9_.:-]"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Where and under which key the item list is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub slot_key: String,
}

impl StoreConfig {
    /// Uses `db_path` with the default `items` slot key.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
        }
    }

    /// Places the default database file under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_DB_FILE_NAME))
    }

    pub fn with_slot_key(mut self, slot_key: impl Into<String>) -> Self {
        self.slot_key = slot_key.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if !is_valid_slot_key(&self.slot_key) {
            return Err(ConfigError::InvalidSlotKey(self.slot_key.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, DEFAULT_DB_FILE_NAME};
    use std::path::Path;

    #[test]
    fn in_dir_uses_default_file_and_slot_key() {
        let config = StoreConfig::in_dir("/tmp/tasks");
        assert_eq!(
            config.db_path,
            Path::new("/tmp/tasks").join(DEFAULT_DB_FILE_NAME)
        );
        assert_eq!(config.slot_key, "items");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_path_and_bad_key() {
        assert_eq!(
            StoreConfig::new("").validate(),
            Err(ConfigError::EmptyDbPath)
        );
        let err = StoreConfig::new("/tmp/x.db")
            .with_slot_key("two words")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("two words"));
    }
}
