//! In-memory entry repository.
//!
//! An arena of entries keyed by id behind a single async `RwLock`. Every
//! multi-row mutation runs inside one write-lock critical section and
//! walks the subtree while holding the lock, which gives the same
//! atomicity the PostgreSQL backend gets from a transaction. Used by the
//! test suites and by embedded deployments that do not need durability.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tokio::sync::RwLock;

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::types::{EntryId, UserId};
use drivebox_entity::entry::{Entry, NewEntry};

use super::EntryRepository;

/// Entry repository backed by an in-process arena.
#[derive(Debug, Default)]
pub struct MemoryEntryRepository {
    entries: RwLock<HashMap<EntryId, Entry>>,
}

impl MemoryEntryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn live_path_taken(entries: &HashMap<EntryId, Entry>, owner_id: UserId, path: &str) -> bool {
        entries
            .values()
            .any(|e| e.owner_id == owner_id && e.path == path && !e.is_deleted)
    }

    /// Ids of every descendant of `root_id`, breadth-first, so parents
    /// always come out before their children and stack depth stays
    /// constant. The root itself is not included.
    fn subtree_ids(entries: &HashMap<EntryId, Entry>, root_id: EntryId) -> Vec<EntryId> {
        let mut ids = Vec::new();
        let mut queue = VecDeque::from([root_id]);
        while let Some(current) = queue.pop_front() {
            let mut level: Vec<(&str, EntryId)> = entries
                .values()
                .filter(|e| e.parent_id == Some(current))
                .map(|e| (e.name.as_str(), e.id))
                .collect();
            level.sort_by(|a, b| a.0.cmp(b.0));
            for (_, id) in level {
                queue.push_back(id);
                ids.push(id);
            }
        }
        ids
    }

    fn check_parent(
        entries: &HashMap<EntryId, Entry>,
        owner_id: UserId,
        parent_id: EntryId,
    ) -> AppResult<()> {
        let parent = entries
            .get(&parent_id)
            .filter(|p| p.owner_id == owner_id)
            .ok_or_else(|| AppError::invalid_parent("Parent entry not found"))?;
        if !parent.is_folder {
            return Err(AppError::invalid_parent(format!(
                "Entry {parent_id} is not a folder"
            )));
        }
        if parent.is_deleted {
            return Err(AppError::invalid_parent(format!(
                "Folder {parent_id} is deleted"
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntryRepository for MemoryEntryRepository {
    async fn insert(&self, data: &NewEntry) -> AppResult<Entry> {
        let mut entries = self.entries.write().await;

        // The parent is re-checked under the write lock so an insert
        // cannot slip a live child under a concurrently deleted folder.
        if let Some(parent_id) = data.parent_id {
            Self::check_parent(&entries, data.owner_id, parent_id)?;
        }

        if Self::live_path_taken(&entries, data.owner_id, &data.path) {
            return Err(AppError::conflict(format!(
                "An entry at path '{}' already exists",
                data.path
            )));
        }

        let now = Utc::now();
        let entry = Entry {
            id: EntryId::new(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            path: data.path.clone(),
            size_bytes: data.size_bytes,
            mime_type: data.mime_type.clone(),
            storage_url: data.storage_url.clone(),
            is_folder: data.is_folder,
            is_starred: false,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find(&self, id: EntryId) -> AppResult<Option<Entry>> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Entry>> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .find(|e| e.owner_id == owner_id && e.path == path && !e.is_deleted)
            .cloned())
    }

    async fn children(
        &self,
        owner_id: UserId,
        parent_id: Option<EntryId>,
        include_deleted: bool,
    ) -> AppResult<Vec<Entry>> {
        let entries = self.entries.read().await;
        let mut result: Vec<Entry> = entries
            .values()
            .filter(|e| {
                e.owner_id == owner_id
                    && e.parent_id == parent_id
                    && (include_deleted || !e.is_deleted)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn apply_subtree_paths(&self, root: &Entry) -> AppResult<Entry> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&root.id) {
            return Err(AppError::not_found(format!("Entry {} not found", root.id)));
        }

        // The subtree is derived under the write lock, so children
        // created after the caller's snapshot are rewritten too.
        let subtree = Self::subtree_ids(&entries, root.id);

        // Mirror the partial unique index: the new root path must not
        // collide with any live entry outside the subtree being rewritten.
        let collision = entries.values().any(|e| {
            e.owner_id == root.owner_id
                && e.path == root.path
                && !e.is_deleted
                && e.id != root.id
                && !subtree.contains(&e.id)
        });
        if collision {
            return Err(AppError::conflict(format!(
                "An entry at path '{}' already exists",
                root.path
            )));
        }

        entries.insert(root.id, root.clone());

        // Parents precede children in the walk order, so each entry's
        // parent already carries its rewritten path.
        let mut new_paths = HashMap::from([(root.id, root.path.clone())]);
        for id in subtree {
            let (parent_id, name) = {
                let entry = entries.get(&id).ok_or_else(|| {
                    AppError::internal(format!("Descendant {id} vanished during update"))
                })?;
                (entry.parent_id, entry.name.clone())
            };
            let parent_id = parent_id.ok_or_else(|| {
                AppError::internal(format!("Descendant {id} has no parent link"))
            })?;
            let base = new_paths.get(&parent_id).ok_or_else(|| {
                AppError::internal(format!("Descendant {id} walked before its parent"))
            })?;
            let path = format!("{base}/{name}");
            new_paths.insert(id, path.clone());

            let entry = entries.get_mut(&id).ok_or_else(|| {
                AppError::internal(format!("Descendant {id} vanished during update"))
            })?;
            entry.path = path;
            entry.updated_at = root.updated_at;
        }
        Ok(root.clone())
    }

    async fn set_deleted(&self, id: EntryId, deleted: bool) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.is_deleted = deleted;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn set_deleted_subtree(&self, id: EntryId) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&id) {
            return Ok(0);
        }

        let mut ids = vec![id];
        ids.extend(Self::subtree_ids(&entries, id));

        let now = Utc::now();
        let mut marked = 0;
        for id in ids {
            if let Some(entry) = entries.get_mut(&id) {
                entry.is_deleted = true;
                entry.updated_at = now;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn set_starred(&self, id: EntryId, starred: bool) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.is_starred = starred;
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn purge_deleted(&self, owner_id: UserId) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !(e.owner_id == owner_id && e.is_deleted));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use drivebox_core::error::ErrorKind;

    fn folder(owner: UserId, name: &str) -> NewEntry {
        NewEntry::folder(owner, None, name, format!("/{name}"))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let created = repo.insert(&folder(owner, "Docs")).await.expect("insert");
        let found = repo.find(created.id).await.expect("find");
        assert_eq!(found.expect("present").path, "/Docs");
    }

    #[tokio::test]
    async fn test_insert_rejects_live_path_conflict() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        repo.insert(&folder(owner, "Docs")).await.expect("insert");
        let err = repo.insert(&folder(owner, "Docs")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_insert_rejects_deleted_parent() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let docs = repo.insert(&folder(owner, "Docs")).await.expect("insert");
        repo.set_deleted(docs.id, true).await.expect("delete");

        let err = repo
            .insert(&NewEntry::file(
                owner,
                Some(docs.id),
                "late.txt",
                "/Docs/late.txt",
                1,
                None,
                None,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParent);
    }

    #[tokio::test]
    async fn test_deleted_path_does_not_block_insert() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let first = repo.insert(&folder(owner, "Docs")).await.expect("insert");
        repo.set_deleted(first.id, true).await.expect("delete");
        repo.insert(&folder(owner, "Docs"))
            .await
            .expect("same path after soft delete");
    }

    #[tokio::test]
    async fn test_same_path_ok_across_owners() {
        let repo = MemoryEntryRepository::new();

        repo.insert(&folder(UserId::new(), "Shared"))
            .await
            .expect("first owner");
        repo.insert(&folder(UserId::new(), "Shared"))
            .await
            .expect("second owner");
    }

    #[tokio::test]
    async fn test_purge_only_touches_deleted() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let live = repo.insert(&folder(owner, "Keep")).await.expect("insert");
        let doomed = repo.insert(&folder(owner, "Trash")).await.expect("insert");
        repo.set_deleted(doomed.id, true).await.expect("delete");

        let purged = repo.purge_deleted(owner).await.expect("purge");
        assert_eq!(purged, 1);
        assert!(repo.find(live.id).await.expect("find").is_some());
        assert!(repo.find(doomed.id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn test_set_deleted_subtree_marks_every_descendant() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let a = repo.insert(&folder(owner, "a")).await.expect("insert");
        let b = repo
            .insert(&NewEntry::folder(owner, Some(a.id), "b", "/a/b"))
            .await
            .expect("insert");
        let c = repo
            .insert(&NewEntry::folder(owner, Some(b.id), "c", "/a/b/c"))
            .await
            .expect("insert");

        let marked = repo.set_deleted_subtree(a.id).await.expect("delete");
        assert_eq!(marked, 3);
        for id in [a.id, b.id, c.id] {
            assert!(repo.find(id).await.expect("find").expect("present").is_deleted);
        }
    }

    #[tokio::test]
    async fn test_apply_subtree_paths_rewrites_descendants() {
        let repo = MemoryEntryRepository::new();
        let owner = UserId::new();

        let a = repo.insert(&folder(owner, "a")).await.expect("insert");
        let b = repo
            .insert(&NewEntry::folder(owner, Some(a.id), "b", "/a/b"))
            .await
            .expect("insert");
        let c = repo
            .insert(&NewEntry::folder(owner, Some(b.id), "c", "/a/b/c"))
            .await
            .expect("insert");

        let mut renamed = a.clone();
        renamed.name = "archive".to_string();
        renamed.path = "/archive".to_string();
        renamed.updated_at = Utc::now();
        repo.apply_subtree_paths(&renamed).await.expect("rename");

        let b = repo.find(b.id).await.expect("find").expect("present");
        let c = repo.find(c.id).await.expect("find").expect("present");
        assert_eq!(b.path, "/archive/b");
        assert_eq!(c.path, "/archive/b/c");
    }
}
