//! Store-level use-case services.
//!
//! # Responsibility
//! - Turn display-layer intents into canonical state transitions.
//! - Keep display, persistence and projection concerns behind one facade.

pub mod item_store;
