//! Background persistence worker.
//!
//! Receives load/save commands from the store, executes them one at a time in
//! submission order, and reports save failures to subscribers.

use super::gateway::{PersistResult, PersistenceGateway};
use crate::model::item::Item;
use crate::notify::{Notifier, StoreEvent};
use crate::repo::slot_repo::{ItemSlot, SlotError};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::thread::{self, JoinHandle};

const WORKER_THREAD_NAME: &str = "tasklist-persist";

enum PersistCommand {
    Load(Sender<PersistResult<Vec<Item>>>),
    Save { revision: u64, items: Vec<Item> },
    Flush(Sender<()>),
    Shutdown,
}

/// Handle to the persistence worker thread.
pub struct SaveWorker {
    tx: Sender<PersistCommand>,
    join: Option<JoinHandle<()>>,
}

impl SaveWorker {
    /// Spawns the worker; it owns `gateway` until shutdown.
    pub fn start<S>(gateway: PersistenceGateway<S>, notifier: Notifier) -> Result<Self, SlotError>
    where
        S: ItemSlot + 'static,
    {
        let (tx, rx) = unbounded();
        let join = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_persist_loop(gateway, notifier, rx))
            .map_err(|err| SlotError::Backend(format!("failed to spawn persistence worker: {err}")))?;
        Ok(Self {
            tx,
            join: Some(join),
        })
    }

    /// Loads the stored item list, blocking until the worker answers.
    pub fn load(&self) -> PersistResult<Vec<Item>> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(PersistCommand::Load(reply_tx))
            .map_err(|_| SlotError::WorkerStopped)?;
        reply_rx.recv().map_err(|_| SlotError::WorkerStopped)?
    }

    /// Queues a save of `items`; returns immediately.
    pub fn enqueue_save(&self, revision: u64, items: Vec<Item>) -> Result<(), SlotError> {
        self.tx
            .send(PersistCommand::Save { revision, items })
            .map_err(|_| SlotError::WorkerStopped)
    }

    /// Blocks until every previously queued command has run.
    pub fn flush(&self) -> Result<(), SlotError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(PersistCommand::Flush(reply_tx))
            .map_err(|_| SlotError::WorkerStopped)?;
        reply_rx.recv().map_err(|_| SlotError::WorkerStopped)
    }

    /// Drains the queue and stops the worker thread.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(PersistCommand::Shutdown);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("event=persist_worker_stop module=persist status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_persist_loop<S: ItemSlot>(
    mut gateway: PersistenceGateway<S>,
    notifier: Notifier,
    rx: Receiver<PersistCommand>,
) {
    info!("event=persist_worker_start module=persist status=ok");
    while let Ok(command) = rx.recv() {
        match command {
            PersistCommand::Load(reply) => {
                let _ = reply.send(gateway.load());
            }
            PersistCommand::Save { revision, items } => {
                if let Err(err) = gateway.save(&items) {
                    warn!(
                        "event=slot_save module=persist status=error error_code=write_failed revision={revision} items={} error={err}",
                        items.len()
                    );
                    notifier.publish(StoreEvent::PersistenceWarning {
                        revision,
                        message: err.to_string(),
                    });
                } else {
                    debug!("event=slot_save module=persist status=ok revision={revision}");
                }
            }
            PersistCommand::Flush(reply) => {
                let _ = reply.send(());
            }
            PersistCommand::Shutdown => break,
        }
    }
    info!("event=persist_worker_stop module=persist status=ok");
}
