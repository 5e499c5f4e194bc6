//! Store-to-display notifications.
//!
//! # Responsibility
//! - Fan out store events to every live subscriber.
//! - Drop subscribers whose receiving side has gone away.
//!
//! # Invariants
//! - Events reach each subscriber in publish order.
//! - Publishing never blocks (unbounded channels).

use crate::filter::Filter;
use crate::model::item::Item;
use crate::projection::RowChange;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// Display-facing view of store state after one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Visible sequence under `filter`.
    pub visible: Vec<Item>,
    /// Row changes from the previously published visible sequence.
    pub changes: Vec<RowChange>,
    pub loading: bool,
    pub all_complete: bool,
    pub filter: Filter,
    pub active_count: usize,
    /// In-progress text of the new-item input.
    pub draft: String,
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// New state is available.
    StateChanged(StoreSnapshot),
    /// A save failed; in-memory state was kept.
    PersistenceWarning { revision: u64, message: String },
}

/// Shared subscriber list; clones publish to the same subscribers.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    subscribers: Arc<Mutex<Vec<Sender<StoreEvent>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.lock().push(tx);
        rx
    }

    /// Sends `event` to all subscribers, pruning disconnected ones.
    pub fn publish(&self, event: StoreEvent) {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let pruned = before - subscribers.len();
        if pruned > 0 {
            debug!("event=subscriber_pruned module=notify count={pruned}");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<StoreEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{Notifier, StoreEvent};

    fn warning(revision: u64) -> StoreEvent {
        StoreEvent::PersistenceWarning {
            revision,
            message: "disk full".to_string(),
        }
    }

    #[test]
    fn publish_reaches_every_subscriber_in_order() {
        let notifier = Notifier::new();
        let first = notifier.subscribe();
        let second = notifier.subscribe();

        notifier.publish(warning(1));
        notifier.publish(warning(2));

        assert_eq!(first.try_recv().unwrap(), warning(1));
        assert_eq!(first.try_recv().unwrap(), warning(2));
        assert_eq!(second.try_iter().count(), 2);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let notifier = Notifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        notifier.publish(warning(1));
        assert_eq!(notifier.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
