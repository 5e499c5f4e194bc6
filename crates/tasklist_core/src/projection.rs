//! Keyed change detection between two visible sequences.
//!
//! # Responsibility
//! - Turn "previous rows" + "next rows" into a minimal list of row changes.
//! - Keep the last rendered rows for incremental updates.
//!
//! # Invariants
//! - Rows are matched by `ItemKey`, never by position.
//! - Rows whose content is structurally equal are never reported as updated.
//! - Rows kept in place form a longest increasing run of previous positions,
//!   so the number of `Move` changes is minimal.
//! - `apply_changes(previous, &diff(previous, next)) == next`.
//!
//! # Application order
//! 1. Detach every `Remove` and `Move` row from the previous list by its
//!    previous index (highest index first).
//! 2. Place every `Insert` and `Move` row at its target index, ascending.
//! 3. Replace content for every `Update` (index into the next list).

use crate::model::item::{Item, ItemKey};
use serde::Serialize;
use std::collections::HashMap;

/// One structural change to a rendered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowChange {
    /// Row removed; `index` is its position in the previous list.
    Remove { index: usize, key: ItemKey },
    /// New row placed at `index` of the next list.
    Insert { index: usize, item: Item },
    /// Existing row repositioned from previous `from` to next `to`.
    Move { from: usize, to: usize, key: ItemKey },
    /// Existing row whose content changed; `index` is in the next list.
    Update { index: usize, item: Item },
}

/// Computes the row changes turning `previous` into `next`.
pub fn diff(previous: &[Item], next: &[Item]) -> Vec<RowChange> {
    let previous_index: HashMap<ItemKey, usize> = previous
        .iter()
        .enumerate()
        .map(|(index, item)| (item.key, index))
        .collect();
    let next_keys: HashMap<ItemKey, usize> = next
        .iter()
        .enumerate()
        .map(|(index, item)| (item.key, index))
        .collect();

    let mut changes = Vec::new();

    for (index, item) in previous.iter().enumerate().rev() {
        if !next_keys.contains_key(&item.key) {
            changes.push(RowChange::Remove {
                index,
                key: item.key,
            });
        }
    }

    // (next index, previous index) for rows present on both sides.
    let shared: Vec<(usize, usize)> = next
        .iter()
        .enumerate()
        .filter_map(|(to, item)| previous_index.get(&item.key).map(|&from| (to, from)))
        .collect();
    let anchored = longest_increasing_run(&shared.iter().map(|&(_, from)| from).collect::<Vec<_>>());
    let mut is_anchor = vec![false; shared.len()];
    for position in anchored {
        is_anchor[position] = true;
    }
    let mut moved_from: HashMap<usize, usize> = HashMap::new();
    for (position, &(to, from)) in shared.iter().enumerate() {
        if !is_anchor[position] {
            moved_from.insert(to, from);
        }
    }

    for (to, item) in next.iter().enumerate() {
        if let Some(&from) = moved_from.get(&to) {
            changes.push(RowChange::Move {
                from,
                to,
                key: item.key,
            });
        } else if !previous_index.contains_key(&item.key) {
            changes.push(RowChange::Insert {
                index: to,
                item: item.clone(),
            });
        }
    }

    for &(to, from) in &shared {
        if previous[from] != next[to] {
            changes.push(RowChange::Update {
                index: to,
                item: next[to].clone(),
            });
        }
    }

    changes
}

/// Applies `changes` (as produced by [`diff`]) to `previous`.
///
/// Used by renderers without native list patching and by tests.
pub fn apply_changes(previous: &[Item], changes: &[RowChange]) -> Vec<Item> {
    let mut detached: Vec<usize> = Vec::new();
    let mut placements: Vec<(usize, Placement)> = Vec::new();

    for change in changes {
        match change {
            RowChange::Remove { index, .. } => detached.push(*index),
            RowChange::Move { from, to, .. } => {
                detached.push(*from);
                placements.push((*to, Placement::Existing(*from)));
            }
            RowChange::Insert { index, item } => {
                placements.push((*index, Placement::New(item.clone())));
            }
            RowChange::Update { .. } => {}
        }
    }

    detached.sort_unstable();
    let mut rows: Vec<Item> = previous
        .iter()
        .enumerate()
        .filter(|(index, _)| detached.binary_search(index).is_err())
        .map(|(_, item)| item.clone())
        .collect();

    placements.sort_by_key(|(to, _)| *to);
    for (to, placement) in placements {
        let item = match placement {
            Placement::Existing(from) => previous[from].clone(),
            Placement::New(item) => item,
        };
        let at = to.min(rows.len());
        rows.insert(at, item);
    }

    for change in changes {
        if let RowChange::Update { index, item } = change {
            if let Some(row) = rows.get_mut(*index) {
                *row = item.clone();
            }
        }
    }

    rows
}

enum Placement {
    Existing(usize),
    New(Item),
}

/// Positions (into `values`) of one longest strictly increasing subsequence.
fn longest_increasing_run(values: &[usize]) -> Vec<usize> {
    // tails[k] = position of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; values.len()];

    for (position, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&tail| values[tail] < value);
        parent[position] = slot.checked_sub(1).map(|prev| tails[prev]);
        if slot == tails.len() {
            tails.push(position);
        } else {
            tails[slot] = position;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        run.push(position);
        cursor = parent[position];
    }
    run.reverse();
    run
}

/// Stateful adapter remembering the last rendered rows.
#[derive(Debug, Clone, Default)]
pub struct ViewProjection {
    rows: Vec<Item>,
}

impl ViewProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows as last handed to the display layer.
    pub fn rows(&self) -> &[Item] {
        &self.rows
    }

    /// Replaces the rendered rows and returns the changes to get there.
    pub fn update(&mut self, next: Vec<Item>) -> Vec<RowChange> {
        let changes = diff(&self.rows, &next);
        self.rows = next;
        changes
    }
}
