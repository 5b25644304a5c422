//! Item kind discriminant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The wire discriminant carried in `path.kind`.
///
/// Only the three kinds below are materialized by default. Anything else
/// the server sends is kept as a plain string on [`crate::ItemPath`] so the
/// factory can decide what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A key-value record.
    Item,
    /// A time-ordered event attached to a key.
    Event,
    /// A graph edge between two keys.
    Relationship,
}

impl ItemKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Item => "item",
            ItemKind::Event => "event",
            ItemKind::Relationship => "relationship",
        }
    }

    /// Parses a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(ItemKind::Item),
            "event" => Some(ItemKind::Event),
            "relationship" => Some(ItemKind::Relationship),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
