//! Storage slot abstractions and implementations.
//!
//! # Responsibility
//! - Define the single opaque key-value slot holding the item list.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - A slot stores one payload; every write replaces it whole.

pub mod slot_repo;
