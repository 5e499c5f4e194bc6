//! Visibility filters over the canonical item sequence.
//!
//! # Responsibility
//! - Classify items as visible or hidden for a named filter.
//! - Parse filter names coming from the display layer.
//!
//! # Invariants
//! - `select` never reorders its input.
//! - `Active` and `Completed` partition any sequence.
//! - Unknown filter names are rejected, never mapped to a default.

use crate::model::item::Item;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Named visibility filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Filter {
    /// Every item.
    #[default]
    All,
    /// Items not yet complete.
    Active,
    /// Completed items.
    Completed,
}

impl Filter {
    /// Returns whether `item` is visible under this filter.
    pub fn matches(self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Active => !item.complete,
            Self::Completed => item.complete,
        }
    }

    /// Stable wire name (`ALL|ACTIVE|COMPLETED`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFilter(pub String);

impl Display for UnknownFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown filter `{}`; expected ALL|ACTIVE|COMPLETED",
            self.0
        )
    }
}

impl Error for UnknownFilter {}

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(UnknownFilter(value.to_string())),
        }
    }
}

/// Returns the items visible under `filter`, in input order.
pub fn select(filter: Filter, items: &[Item]) -> Vec<Item> {
    items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect()
}
