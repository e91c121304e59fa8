//! Breadcrumb trail value objects for hierarchical navigation.

use serde::{Deserialize, Serialize};

use drivebox_core::types::EntryId;

use super::model::Entry;

/// One segment of a breadcrumb trail, root-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// Entry ID of this segment.
    pub id: EntryId,
    /// Display name of this segment.
    pub name: String,
    /// Full path up to and including this segment.
    pub path: String,
}

impl From<&Entry> for Breadcrumb {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            path: entry.path.clone(),
        }
    }
}

impl Breadcrumb {
    /// Build a root-first trail from an ordered ancestor chain.
    pub fn trail(entries: &[Entry]) -> Vec<Breadcrumb> {
        entries.iter().map(Breadcrumb::from).collect()
    }
}
