//! Persistence of the canonical item sequence.
//!
//! # Responsibility
//! - Encode/decode the item list payload.
//! - Load and save through one opaque slot.
//! - Run saves off the intent path, in submission order.
//!
//! # Invariants
//! - `decode(encode(x))` keeps `key`, `text` and `complete` of every item.
//! - Save failures never roll back in-memory state.

pub mod codec;
pub mod gateway;
pub mod worker;

pub use gateway::{PersistError, PersistResult, PersistenceGateway};
pub use worker::SaveWorker;
