//! Item domain model.
//!
//! # Responsibility
//! - Define the canonical task-list record.
//! - Generate creation-ordered keys.
//!
//! # Invariants
//! - `key` is stable for the item lifetime and never reused.
//! - `editing` is transient UI state and never reaches storage.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable identifier of one item.
///
/// Holds Unix epoch milliseconds at creation time, bumped when needed so
/// that keys are strictly increasing within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(pub i64);

impl Display for ItemKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One task-list entry.
///
/// Structural equality is used for change detection; use [`Item::same_key`]
/// for identity matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub key: ItemKey,
    pub text: String,
    pub complete: bool,
    /// True while the row text is being edited. Not persisted.
    #[serde(default, skip_serializing)]
    pub editing: bool,
}

impl Item {
    /// Creates an active, non-editing item.
    pub fn new(key: ItemKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
            complete: false,
            editing: false,
        }
    }

    /// Returns whether both records describe the same row.
    pub fn same_key(&self, other: &Item) -> bool {
        self.key == other.key
    }

    /// Returns whether this item counts toward the active counter.
    pub fn is_active(&self) -> bool {
        !self.complete
    }
}

/// Issues strictly increasing item keys from the wall clock.
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    last: Option<i64>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure future keys sort after `key`.
    ///
    /// Called after hydration so new items never collide with loaded ones.
    pub fn observe(&mut self, key: ItemKey) {
        if self.last.map_or(true, |last| key.0 > last) {
            self.last = Some(key.0);
        }
    }

    /// Returns the next key using the current wall clock.
    pub fn next_key(&mut self) -> Option<ItemKey> {
        self.next_key_at(now_epoch_ms())
    }

    /// Returns the next key for a given clock reading.
    ///
    /// Falls back to `last + 1` when the clock did not advance. Returns
    /// `None` once `i64::MAX` has been issued or observed.
    pub fn next_key_at(&mut self, now_ms: i64) -> Option<ItemKey> {
        let value = match self.last {
            Some(last) if now_ms <= last => last.checked_add(1)?,
            _ => now_ms,
        };
        self.last = Some(value);
        Some(ItemKey(value))
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Item, ItemKey, KeyGenerator};

    #[test]
    fn next_key_is_strictly_increasing_when_clock_stalls() {
        let mut keys = KeyGenerator::new();
        assert_eq!(keys.next_key_at(1_000), Some(ItemKey(1_000)));
        assert_eq!(keys.next_key_at(1_000), Some(ItemKey(1_001)));
        assert_eq!(keys.next_key_at(999), Some(ItemKey(1_002)));
    }

    #[test]
    fn observe_moves_generator_past_loaded_keys() {
        let mut keys = KeyGenerator::new();
        keys.observe(ItemKey(5_000));
        keys.observe(ItemKey(4_000));
        assert_eq!(keys.next_key_at(1_000), Some(ItemKey(5_001)));
        assert_eq!(keys.next_key_at(9_000), Some(ItemKey(9_000)));
    }

    #[test]
    fn exhausted_key_space_issues_no_key() {
        let mut keys = KeyGenerator::new();
        keys.observe(ItemKey(i64::MAX));
        assert_eq!(keys.next_key_at(1_000), None);
        assert_eq!(keys.next_key_at(i64::MAX), None);

        let mut fresh = KeyGenerator::new();
        assert_eq!(fresh.next_key_at(i64::MAX), Some(ItemKey(i64::MAX)));
        assert_eq!(fresh.next_key_at(i64::MAX), None);
    }

    #[test]
    fn new_item_starts_active_and_not_editing() {
        let item = Item::new(ItemKey(1), "Buy milk");
        assert!(item.is_active());
        assert!(!item.editing);
        assert!(item.same_key(&Item::new(ItemKey(1), "other text")));
    }
}
