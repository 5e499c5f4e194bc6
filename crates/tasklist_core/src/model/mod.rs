//! Task-list domain model.
//!
//! # Responsibility
//! - Define the item record shared by store, persistence and projection.
//! - Issue stable, strictly increasing item keys.
//!
//! # Invariants
//! - Every item is identified by a unique `ItemKey`.
//! - Key order matches creation order.

pub mod item;
