//! Item store: the single owner of task-list state.
//!
//! # Responsibility
//! - Apply user intents to the canonical item sequence.
//! - Keep the visible sequence and row projection in sync with the filter.
//! - Queue a save after every mutation and notify subscribers.
//!
//! # Invariants
//! - Keys are unique in the canonical sequence; insertion order is kept.
//! - `visible == select(filter, items)` after every operation.
//! - Saves are queued in mutation order; a failed save never rolls back.
//! - Intents that do not change anything neither save nor notify.
//! - Canonical mutations are ignored until `hydrate` has run.

use crate::config::{ConfigError, StoreConfig};
use crate::filter::{select, Filter, UnknownFilter};
use crate::model::item::{Item, ItemKey, KeyGenerator};
use crate::notify::{Notifier, StoreEvent, StoreSnapshot};
use crate::persist::{PersistError, PersistenceGateway, SaveWorker};
use crate::projection::{RowChange, ViewProjection};
use crate::repo::slot_repo::{ItemSlot, SlotError, SqliteItemSlot};
use crossbeam::channel::Receiver;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store construction and checked intents.
#[derive(Debug)]
pub enum StoreError {
    Config(ConfigError),
    Slot(SlotError),
    UnknownFilter(UnknownFilter),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Slot(err) => write!(f, "{err}"),
            Self::UnknownFilter(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Slot(err) => Some(err),
            Self::UnknownFilter(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SlotError> for StoreError {
    fn from(value: SlotError) -> Self {
        Self::Slot(value)
    }
}

impl From<UnknownFilter> for StoreError {
    fn from(value: UnknownFilter) -> Self {
        Self::UnknownFilter(value)
    }
}

/// Canonical task-list state plus its derived view.
pub struct ItemStore {
    items: Vec<Item>,
    visible: Vec<Item>,
    filter: Filter,
    all_complete: bool,
    loading: bool,
    draft: String,
    keys: KeyGenerator,
    projection: ViewProjection,
    revision: u64,
    notifier: Notifier,
    worker: SaveWorker,
}

impl ItemStore {
    /// Opens the SQLite slot named by `config` and hydrates from it.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let slot = SqliteItemSlot::open(&config.db_path, config.slot_key.as_str())?;
        let mut store = Self::with_slot(slot)?;
        store.hydrate();
        Ok(store)
    }

    /// Creates a store in the `loading` state backed by `slot`.
    ///
    /// Call [`ItemStore::hydrate`] before sending intents.
    pub fn with_slot<S>(slot: S) -> StoreResult<Self>
    where
        S: ItemSlot + 'static,
    {
        let notifier = Notifier::new();
        let worker = SaveWorker::start(PersistenceGateway::new(slot), notifier.clone())?;
        Ok(Self {
            items: Vec::new(),
            visible: Vec::new(),
            filter: Filter::All,
            all_complete: false,
            loading: true,
            draft: String::new(),
            keys: KeyGenerator::new(),
            projection: ViewProjection::new(),
            revision: 0,
            notifier,
            worker,
        })
    }

    /// Loads the persisted sequence once and leaves the `loading` state.
    ///
    /// Missing or unreadable state starts the store empty. Repeated calls
    /// are no-ops.
    pub fn hydrate(&mut self) {
        if !self.loading {
            return;
        }
        let started_at = Instant::now();
        let items = match self.worker.load() {
            Ok(items) => items,
            Err(PersistError::NotFound) => {
                info!("event=store_hydrate module=store status=empty reason=not_found");
                Vec::new()
            }
            Err(PersistError::Malformed(message)) => {
                warn!(
                    "event=store_hydrate module=store status=recovered error_code=malformed_state error={message}"
                );
                Vec::new()
            }
            Err(err) => {
                error!(
                    "event=store_hydrate module=store status=recovered error_code=load_failed error={err}"
                );
                Vec::new()
            }
        };

        for item in &items {
            self.keys.observe(item.key);
        }
        self.items = items;
        self.loading = false;
        info!(
            "event=store_hydrate module=store status=ok items={} duration_ms={}",
            self.items.len(),
            started_at.elapsed().as_millis()
        );
        self.refresh_view();
    }

    /// Registers a display-layer subscriber.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        self.notifier.subscribe()
    }

    /// Appends a new active item; blank text is ignored.
    ///
    /// Returns the new key, or `None` when nothing was added.
    pub fn add_item(&mut self, text: impl Into<String>) -> Option<ItemKey> {
        let text = text.into();
        if !self.accepts_mutation("add_item") || text.trim().is_empty() {
            return None;
        }
        let Some(key) = self.keys.next_key() else {
            warn!("event=intent module=store intent=add_item status=rejected reason=key_space_exhausted");
            return None;
        };
        let next = appended(&self.items, Item::new(key, text));
        self.commit("add_item", next);
        Some(key)
    }

    /// Replaces the text of item `key`.
    pub fn update_text(&mut self, key: ItemKey, text: impl Into<String>) {
        let text = text.into();
        self.update_where("update_text", key, move |item| item.text = text);
    }

    /// Sets the transient editing flag of item `key`.
    pub fn toggle_editing(&mut self, key: ItemKey, editing: bool) {
        self.update_where("toggle_editing", key, move |item| item.editing = editing);
    }

    /// Sets the completion flag of item `key`.
    pub fn set_complete(&mut self, key: ItemKey, complete: bool) {
        self.update_where("set_complete", key, move |item| item.complete = complete);
    }

    /// Deletes item `key`.
    pub fn remove_item(&mut self, key: ItemKey) {
        if !self.accepts_mutation("remove_item") {
            return;
        }
        match without_key(&self.items, key) {
            Some(next) => self.commit("remove_item", next),
            None => debug!("event=intent module=store intent=remove_item status=noop key={key}"),
        }
    }

    /// Flips the tracked `all_complete` flag and applies it to every item.
    ///
    /// The flag is not derived from item state: with mixed items and the flag
    /// `false`, every item becomes complete.
    pub fn toggle_all_complete(&mut self) {
        if !self.accepts_mutation("toggle_all_complete") {
            return;
        }
        self.all_complete = !self.all_complete;
        let complete = self.all_complete;
        let next: Vec<Item> = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.complete = complete;
                item
            })
            .collect();
        self.commit("toggle_all_complete", next);
    }

    /// Drops every completed item.
    pub fn clear_completed(&mut self) {
        if !self.accepts_mutation("clear_completed") {
            return;
        }
        let next = select(Filter::Active, &self.items);
        if next.len() == self.items.len() {
            debug!("event=intent module=store intent=clear_completed status=noop");
            return;
        }
        self.commit("clear_completed", next);
    }

    /// Changes the active filter; the canonical sequence is untouched.
    pub fn set_filter(&mut self, filter: Filter) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        debug!("event=intent module=store intent=set_filter filter={filter}");
        self.refresh_view();
    }

    /// Parses `name` and changes the active filter.
    ///
    /// # Errors
    /// - Returns `StoreError::UnknownFilter` for names outside `ALL|ACTIVE|COMPLETED`.
    pub fn set_filter_named(&mut self, name: &str) -> StoreResult<()> {
        let filter = name.parse::<Filter>()?;
        self.set_filter(filter);
        Ok(())
    }

    /// Updates the in-progress new-item text.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.draft == text {
            return;
        }
        self.draft = text;
        self.refresh_view();
    }

    /// Adds the draft as a new item and clears it on success.
    pub fn submit_draft(&mut self) -> Option<ItemKey> {
        let draft = self.draft.clone();
        let key = self.add_item(draft)?;
        self.set_draft(String::new());
        Some(key)
    }

    /// Number of incomplete items, regardless of the active filter.
    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_active()).count()
    }

    /// Canonical sequence.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Visible sequence under the active filter.
    pub fn visible(&self) -> &[Item] {
        &self.visible
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn all_complete(&self) -> bool {
        self.all_complete
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Number of committed mutations since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current state without row changes.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot_with(Vec::new())
    }

    /// Blocks until every queued save has been attempted.
    pub fn flush(&self) -> StoreResult<()> {
        self.worker.flush()?;
        Ok(())
    }

    fn accepts_mutation(&self, intent: &'static str) -> bool {
        if self.loading {
            warn!("event=intent module=store intent={intent} status=rejected reason=loading");
            return false;
        }
        true
    }

    fn update_where(&mut self, intent: &'static str, key: ItemKey, update: impl FnOnce(&mut Item)) {
        if !self.accepts_mutation(intent) {
            return;
        }
        match replaced(&self.items, key, update) {
            Some(next) => self.commit(intent, next),
            None => debug!("event=intent module=store intent={intent} status=noop key={key}"),
        }
    }

    fn commit(&mut self, intent: &'static str, next: Vec<Item>) {
        self.items = next;
        self.revision += 1;
        debug!(
            "event=intent module=store intent={intent} status=ok revision={} items={}",
            self.revision,
            self.items.len()
        );

        if let Err(err) = self.worker.enqueue_save(self.revision, self.items.clone()) {
            error!(
                "event=slot_save module=store status=error error_code=enqueue_failed revision={} error={err}",
                self.revision
            );
            self.notifier.publish(StoreEvent::PersistenceWarning {
                revision: self.revision,
                message: err.to_string(),
            });
        }

        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.visible = select(self.filter, &self.items);
        let changes = self.projection.update(self.visible.clone());
        let snapshot = self.snapshot_with(changes);
        self.notifier.publish(StoreEvent::StateChanged(snapshot));
    }

    fn snapshot_with(&self, changes: Vec<RowChange>) -> StoreSnapshot {
        StoreSnapshot {
            visible: self.visible.clone(),
            changes,
            loading: self.loading,
            all_complete: self.all_complete,
            filter: self.filter,
            active_count: self.active_count(),
            draft: self.draft.clone(),
        }
    }
}

fn appended(items: &[Item], item: Item) -> Vec<Item> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(items);
    next.push(item);
    next
}

/// Copy of `items` with the `key` row updated, or `None` when absent.
fn replaced(items: &[Item], key: ItemKey, update: impl FnOnce(&mut Item)) -> Option<Vec<Item>> {
    let position = items.iter().position(|item| item.key == key)?;
    let mut next = items.to_vec();
    update(&mut next[position]);
    Some(next)
}

/// Copy of `items` without the `key` row, or `None` when absent.
fn without_key(items: &[Item], key: ItemKey) -> Option<Vec<Item>> {
    if !items.iter().any(|item| item.key == key) {
        return None;
    }
    Some(items.iter().filter(|item| item.key != key).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::{replaced, without_key, ItemStore};
    use crate::filter::Filter;
    use crate::model::item::{Item, ItemKey};
    use crate::repo::slot_repo::MemoryItemSlot;

    fn hydrated_store() -> ItemStore {
        let mut store = ItemStore::with_slot(MemoryItemSlot::new()).unwrap();
        store.hydrate();
        store
    }

    #[test]
    fn replaced_returns_none_for_missing_key() {
        let items = vec![Item::new(ItemKey(1), "a")];
        assert!(replaced(&items, ItemKey(2), |item| item.complete = true).is_none());
        let next = replaced(&items, ItemKey(1), |item| item.complete = true).unwrap();
        assert!(next[0].complete);
        assert!(!items[0].complete);
    }

    #[test]
    fn without_key_keeps_order() {
        let items = vec![
            Item::new(ItemKey(1), "a"),
            Item::new(ItemKey(2), "b"),
            Item::new(ItemKey(3), "c"),
        ];
        let next = without_key(&items, ItemKey(2)).unwrap();
        assert_eq!(
            next.iter().map(|item| item.key).collect::<Vec<_>>(),
            vec![ItemKey(1), ItemKey(3)]
        );
        assert!(without_key(&items, ItemKey(9)).is_none());
    }

    #[test]
    fn intents_are_ignored_while_loading() {
        let mut store = ItemStore::with_slot(MemoryItemSlot::new()).unwrap();
        assert!(store.is_loading());
        assert_eq!(store.add_item("too early"), None);
        store.toggle_all_complete();
        assert!(store.items().is_empty());
        assert!(!store.all_complete());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn hydrate_is_single_shot() {
        let mut store = hydrated_store();
        store.add_item("kept");
        store.hydrate();
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn unknown_key_intents_do_not_bump_revision() {
        let mut store = hydrated_store();
        store.update_text(ItemKey(42), "x");
        store.set_complete(ItemKey(42), true);
        store.toggle_editing(ItemKey(42), true);
        store.remove_item(ItemKey(42));
        store.clear_completed();
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn set_filter_does_not_mutate_canonical_sequence() {
        let mut store = hydrated_store();
        let key = store.add_item("a").unwrap();
        store.set_complete(key, true);
        let revision = store.revision();

        store.set_filter(Filter::Active);
        assert!(store.visible().is_empty());
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.revision(), revision);
    }
}
