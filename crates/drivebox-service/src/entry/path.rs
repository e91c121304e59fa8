//! Path resolution for the entry tree.
//!
//! Paths are materialized from ancestor names. This module derives the
//! path for a single entry from its ancestor chain; subtree-wide path
//! rewrites happen inside the repository backends, within their own
//! transactional scope. It holds no state of its own.

use std::collections::HashSet;

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::types::EntryId;
use drivebox_database::repository::EntryRepository;
use drivebox_entity::entry::Entry;

/// Upper bound on ancestor-chain length. A well-formed tree never gets
/// close; the walk refuses to go further so corrupt data cannot hang it.
pub const MAX_TREE_DEPTH: usize = 128;

/// Compute the canonical path for an entry from its ancestor chain
/// (root-first, up to and including the immediate parent) and its name.
pub fn resolve_path(ancestors: &[Entry], name: &str) -> String {
    let mut path = String::new();
    for ancestor in ancestors {
        path.push('/');
        path.push_str(&ancestor.name);
    }
    path.push('/');
    path.push_str(name);
    path
}

/// Walk `parent_id` links from an entry up to its root.
///
/// Returns the chain root-first, excluding the entry itself. The walk
/// keeps a seen-set and a depth bound: invariant checks on every mutation
/// should make a cycle impossible, but the traversal must not trust that
/// when the data is corrupt.
pub async fn ancestors_of(repo: &dyn EntryRepository, id: EntryId) -> AppResult<Vec<Entry>> {
    let entry = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;

    let mut seen = HashSet::from([id]);
    let mut chain = Vec::new();
    let mut cursor = entry.parent_id;

    while let Some(parent_id) = cursor {
        if !seen.insert(parent_id) {
            return Err(AppError::cycle_detected(format!(
                "Ancestor chain of entry {id} revisits {parent_id}"
            )));
        }
        if chain.len() >= MAX_TREE_DEPTH {
            return Err(AppError::cycle_detected(format!(
                "Ancestor chain of entry {id} exceeds depth {MAX_TREE_DEPTH}"
            )));
        }
        let parent = repo.find(parent_id).await?.ok_or_else(|| {
            AppError::internal(format!("Parent {parent_id} missing from entry tree"))
        })?;
        cursor = parent.parent_id;
        chain.push(parent);
    }

    chain.reverse();
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use chrono::Utc;
    use drivebox_core::error::ErrorKind;
    use drivebox_core::types::UserId;
    use drivebox_entity::entry::NewEntry;

    fn entry(id: EntryId, parent_id: Option<EntryId>, name: &str, path: &str) -> Entry {
        let now = Utc::now();
        Entry {
            id,
            owner_id: UserId::new(),
            parent_id,
            name: name.to_string(),
            path: path.to_string(),
            size_bytes: 0,
            mime_type: "folder".to_string(),
            storage_url: None,
            is_folder: true,
            is_starred: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_path_at_root() {
        assert_eq!(resolve_path(&[], "Docs"), "/Docs");
    }

    #[test]
    fn test_resolve_path_nested() {
        let a = entry(EntryId::new(), None, "a", "/a");
        let b = entry(EntryId::new(), Some(a.id), "b", "/a/b");
        assert_eq!(resolve_path(&[a, b], "c.txt"), "/a/b/c.txt");
    }

    /// Minimal repository stub that serves a fixed set of entries,
    /// including deliberately corrupt ones no API call could produce.
    struct StubRepo {
        entries: HashMap<EntryId, Entry>,
    }

    #[async_trait::async_trait]
    impl EntryRepository for StubRepo {
        async fn insert(&self, _data: &NewEntry) -> AppResult<Entry> {
            Err(AppError::internal("not used"))
        }
        async fn find(&self, id: EntryId) -> AppResult<Option<Entry>> {
            Ok(self.entries.get(&id).cloned())
        }
        async fn find_by_path(&self, _owner_id: UserId, _path: &str) -> AppResult<Option<Entry>> {
            Err(AppError::internal("not used"))
        }
        async fn children(
            &self,
            _owner_id: UserId,
            _parent_id: Option<EntryId>,
            _include_deleted: bool,
        ) -> AppResult<Vec<Entry>> {
            Err(AppError::internal("not used"))
        }
        async fn apply_subtree_paths(&self, _root: &Entry) -> AppResult<Entry> {
            Err(AppError::internal("not used"))
        }
        async fn set_deleted(&self, _id: EntryId, _deleted: bool) -> AppResult<()> {
            Err(AppError::internal("not used"))
        }
        async fn set_deleted_subtree(&self, _id: EntryId) -> AppResult<u64> {
            Err(AppError::internal("not used"))
        }
        async fn set_starred(&self, _id: EntryId, _starred: bool) -> AppResult<()> {
            Err(AppError::internal("not used"))
        }
        async fn purge_deleted(&self, _owner_id: UserId) -> AppResult<u64> {
            Err(AppError::internal("not used"))
        }
    }

    #[tokio::test]
    async fn test_ancestors_of_walks_root_first() {
        let a = entry(EntryId::new(), None, "a", "/a");
        let b = entry(EntryId::new(), Some(a.id), "b", "/a/b");
        let c = entry(EntryId::new(), Some(b.id), "c", "/a/b/c");
        let repo = StubRepo {
            entries: HashMap::from([(a.id, a.clone()), (b.id, b.clone()), (c.id, c.clone())]),
        };

        let chain = ancestors_of(&repo, c.id).await.expect("chain");
        let ids: Vec<EntryId> = chain.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_ancestors_of_detects_corrupt_cycle() {
        // Two entries pointing at each other; only corrupt data looks
        // like this, the walk must still terminate.
        let a_id = EntryId::new();
        let b_id = EntryId::new();
        let a = entry(a_id, Some(b_id), "a", "/b/a");
        let b = entry(b_id, Some(a_id), "b", "/a/b");
        let repo = StubRepo {
            entries: HashMap::from([(a_id, a), (b_id, b)]),
        };

        let err = ancestors_of(&repo, a_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CycleDetected);
    }

    #[tokio::test]
    async fn test_ancestors_of_bounds_depth() {
        // A chain longer than MAX_TREE_DEPTH, each entry its own parent's
        // child, no revisit. The depth bound has to stop the walk.
        let mut entries = HashMap::new();
        let mut parent: Option<EntryId> = None;
        let mut last = EntryId::new();
        for i in 0..(MAX_TREE_DEPTH + 2) {
            let id = EntryId::new();
            entries.insert(id, entry(id, parent, &format!("d{i}"), "/deep"));
            parent = Some(id);
            last = id;
        }
        let repo = StubRepo { entries };

        let err = ancestors_of(&repo, last).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CycleDetected);
    }
}
