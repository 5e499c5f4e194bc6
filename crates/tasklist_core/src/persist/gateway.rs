//! Load/save of the item sequence through one slot.
//!
//! # Invariants
//! - An empty slot is `NotFound`, not an empty list.
//! - A payload that does not parse is `Malformed`; callers recover with an
//!   empty sequence.

use super::codec::{decode, encode};
use crate::model::item::Item;
use crate::repo::slot_repo::{ItemSlot, SlotError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type PersistResult<T> = Result<T, PersistError>;

/// Persistence failure kinds.
#[derive(Debug)]
pub enum PersistError {
    /// Slot has never been written.
    NotFound,
    /// Stored payload is not an item list.
    Malformed(String),
    /// Item list could not be serialized.
    Encode(String),
    /// Underlying slot failed.
    Slot(SlotError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no persisted item list"),
            Self::Malformed(message) => write!(f, "malformed persisted state: {message}"),
            Self::Encode(message) => write!(f, "failed to encode item list: {message}"),
            Self::Slot(err) => write!(f, "persistence write failure: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Slot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SlotError> for PersistError {
    fn from(value: SlotError) -> Self {
        Self::Slot(value)
    }
}

/// Codec + slot pair used by the save worker.
pub struct PersistenceGateway<S: ItemSlot> {
    slot: S,
}

impl<S: ItemSlot> PersistenceGateway<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    /// Reads and decodes the stored item list.
    pub fn load(&mut self) -> PersistResult<Vec<Item>> {
        let payload = self.slot.read()?.ok_or(PersistError::NotFound)?;
        decode(&payload).map_err(|err| {
            warn!(
                "event=slot_load module=persist status=error error_code=malformed_state payload_bytes={} error={err}",
                payload.len()
            );
            PersistError::Malformed(err.to_string())
        })
    }

    /// Encodes and writes `items`, replacing the previous payload.
    pub fn save(&mut self, items: &[Item]) -> PersistResult<()> {
        let started_at = Instant::now();
        let payload = encode(items).map_err(|err| PersistError::Encode(err.to_string()))?;
        self.slot.write(&payload)?;
        debug!(
            "event=slot_save module=persist status=ok items={} payload_bytes={} duration_ms={}",
            items.len(),
            payload.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PersistError, PersistenceGateway};
    use crate::model::item::{Item, ItemKey};
    use crate::repo::slot_repo::{MemoryItemSlot, SqliteItemSlot};

    #[test]
    fn load_from_empty_slot_is_not_found() {
        let mut gateway = PersistenceGateway::new(MemoryItemSlot::new());
        assert!(matches!(gateway.load(), Err(PersistError::NotFound)));
    }

    #[test]
    fn load_of_garbage_is_malformed() {
        let mut gateway = PersistenceGateway::new(MemoryItemSlot::with_payload("{oops"));
        assert!(matches!(gateway.load(), Err(PersistError::Malformed(_))));
    }

    #[test]
    fn save_then_load_roundtrips_persisted_fields() {
        let mut gateway = PersistenceGateway::new(SqliteItemSlot::open_in_memory("items").unwrap());
        let mut done = Item::new(ItemKey(2), "Walk dog");
        done.complete = true;
        let items = vec![Item::new(ItemKey(1), "Buy milk"), done, Item::new(ItemKey(3), "")];

        gateway.save(&items).unwrap();
        assert_eq!(gateway.load().unwrap(), items);
    }
}
