//! Core state container for the task-list app.
//! Owns the canonical item list, its filtered view, persistence and
//! change-minimal row updates for the display layer.

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod notify;
pub mod persist;
pub mod projection;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig};
pub use filter::{select, Filter, UnknownFilter};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::item::{Item, ItemKey, KeyGenerator};
pub use notify::{StoreEvent, StoreSnapshot};
pub use persist::{PersistError, PersistResult, PersistenceGateway};
pub use projection::{apply_changes, diff, RowChange, ViewProjection};
pub use repo::slot_repo::{ItemSlot, MemoryItemSlot, SlotError, SlotResult, SqliteItemSlot};
pub use service::item_store::{ItemStore, StoreError, StoreResult};
