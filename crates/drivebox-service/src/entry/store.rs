//! Entry CRUD and tree-mutation operations.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::types::{EntryId, UserId};
use drivebox_database::repository::EntryRepository;
use drivebox_entity::entry::{Breadcrumb, Entry, NewEntry};

use super::{guard, path};

/// Manages the per-owner file/folder tree.
///
/// Every mutation validates against the integrity guard first, then
/// commits through a single atomic repository call, so cascades never
/// leave the tree half-updated.
#[derive(Clone)]
pub struct EntryStore {
    /// The persistence backend.
    repo: Arc<dyn EntryRepository>,
}

/// Request to create a new entry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateEntryRequest {
    /// Parent folder ID (None for root-level).
    pub parent_id: Option<EntryId>,
    /// Entry name.
    pub name: String,
    /// Whether to create a folder. The kind never changes afterwards.
    pub is_folder: bool,
    /// File size in bytes; ignored for folders.
    #[serde(default)]
    pub size_bytes: i64,
    /// MIME type; ignored for folders.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Opaque content reference; ignored for folders.
    #[serde(default)]
    pub storage_url: Option<String>,
}

impl CreateEntryRequest {
    /// Request for a new folder.
    pub fn folder(parent_id: Option<EntryId>, name: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
            is_folder: true,
            size_bytes: 0,
            mime_type: None,
            storage_url: None,
        }
    }

    /// Request for a new file.
    pub fn file(
        parent_id: Option<EntryId>,
        name: impl Into<String>,
        size_bytes: i64,
        mime_type: Option<String>,
        storage_url: Option<String>,
    ) -> Self {
        Self {
            parent_id,
            name: name.into(),
            is_folder: false,
            size_bytes,
            mime_type,
            storage_url,
        }
    }
}

impl EntryStore {
    /// Creates a new entry store over a persistence backend.
    pub fn new(repo: Arc<dyn EntryRepository>) -> Self {
        Self { repo }
    }

    /// Creates a new entry under an existing folder or at the root.
    pub async fn create(&self, actor_id: UserId, req: CreateEntryRequest) -> AppResult<Entry> {
        guard::check_name(&req.name)?;
        let name = req.name.trim();

        let chain = self.resolve_parent_chain(actor_id, req.parent_id).await?;
        let new_path = path::resolve_path(&chain, name);

        if self.repo.find_by_path(actor_id, &new_path).await?.is_some() {
            return Err(AppError::conflict(format!(
                "An entry at path '{new_path}' already exists"
            )));
        }

        let record = if req.is_folder {
            NewEntry::folder(actor_id, req.parent_id, name, new_path)
        } else {
            if req.size_bytes < 0 {
                return Err(AppError::validation("File size cannot be negative"));
            }
            NewEntry::file(
                actor_id,
                req.parent_id,
                name,
                new_path,
                req.size_bytes,
                req.mime_type,
                req.storage_url,
            )
        };

        let entry = self.repo.insert(&record).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %entry.id,
            path = %entry.path,
            is_folder = entry.is_folder,
            "Entry created"
        );

        Ok(entry)
    }

    /// Renames an entry, cascading the path change to every descendant.
    pub async fn rename(
        &self,
        actor_id: UserId,
        id: EntryId,
        new_name: &str,
    ) -> AppResult<Entry> {
        guard::check_name(new_name)?;
        let new_name = new_name.trim();

        let mut entry = self.fetch_owned(actor_id, id, false).await?;

        let chain = path::ancestors_of(self.repo.as_ref(), id).await?;
        let new_path = path::resolve_path(&chain, new_name);
        self.check_path_free(actor_id, id, &new_path).await?;

        let old_path = entry.path.clone();
        entry.name = new_name.to_string();
        entry.path = new_path;
        entry.updated_at = Utc::now();

        let stored = self.repo.apply_subtree_paths(&entry).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %id,
            old_path = %old_path,
            new_path = %stored.path,
            "Entry renamed"
        );

        Ok(stored)
    }

    /// Moves an entry to a new parent (or to the root), cascading the
    /// path change to every descendant.
    pub async fn move_entry(
        &self,
        actor_id: UserId,
        id: EntryId,
        new_parent_id: Option<EntryId>,
    ) -> AppResult<Entry> {
        let mut entry = self.fetch_owned(actor_id, id, false).await?;

        // Checked after the ownership fetch, so an unknown or foreign id
        // still reads as NotFound rather than revealing cycle handling.
        if new_parent_id == Some(id) {
            return Err(AppError::cycle_detected("Cannot move an entry into itself"));
        }

        let chain = self.resolve_parent_chain(actor_id, new_parent_id).await?;
        guard::check_reparent(id, &chain)?;

        let new_path = path::resolve_path(&chain, &entry.name);
        self.check_path_free(actor_id, id, &new_path).await?;

        let old_path = entry.path.clone();
        entry.parent_id = new_parent_id;
        entry.path = new_path;
        entry.updated_at = Utc::now();

        let stored = self.repo.apply_subtree_paths(&entry).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %id,
            old_path = %old_path,
            new_path = %stored.path,
            "Entry moved"
        );

        Ok(stored)
    }

    /// Soft-deletes an entry and its entire subtree.
    pub async fn soft_delete(&self, actor_id: UserId, id: EntryId) -> AppResult<()> {
        let entry = self.fetch_owned(actor_id, id, true).await?;

        // The repository walks and marks the subtree in one atomic
        // operation, so a concurrent mutation cannot observe or extend a
        // half-deleted tree.
        let subtree_size = self.repo.set_deleted_subtree(id).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %id,
            path = %entry.path,
            subtree_size,
            "Entry subtree soft-deleted"
        );

        Ok(())
    }

    /// Restores a soft-deleted entry.
    ///
    /// Only the entry itself is restored; a subtree is brought back by
    /// restoring top-down. Fails while any ancestor is still deleted.
    pub async fn restore(&self, actor_id: UserId, id: EntryId) -> AppResult<()> {
        let entry = self.fetch_owned(actor_id, id, true).await?;
        if !entry.is_deleted {
            return Ok(());
        }

        let chain = path::ancestors_of(self.repo.as_ref(), id).await?;
        if chain.iter().any(|ancestor| ancestor.is_deleted) {
            return Err(AppError::invalid_restore(
                "Cannot restore an entry while an ancestor is deleted; restore the parent first",
            ));
        }

        // A live entry may have taken the path while this one sat in the
        // trash.
        self.check_path_free(actor_id, id, &entry.path).await?;

        self.repo.set_deleted(id, false).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %id,
            path = %entry.path,
            "Entry restored"
        );

        Ok(())
    }

    /// Stars or unstars an entry. Idempotent.
    pub async fn set_starred(
        &self,
        actor_id: UserId,
        id: EntryId,
        starred: bool,
    ) -> AppResult<()> {
        let entry = self.fetch_owned(actor_id, id, false).await?;
        self.repo.set_starred(entry.id, starred).await?;

        info!(
            owner_id = %actor_id,
            entry_id = %id,
            starred,
            "Entry starred flag updated"
        );

        Ok(())
    }

    /// Lists the immediate children of a folder (or the root level),
    /// ordered by name ascending.
    pub async fn list_children(
        &self,
        owner_id: UserId,
        parent_id: Option<EntryId>,
        include_deleted: bool,
    ) -> AppResult<Vec<Entry>> {
        self.repo
            .children(owner_id, parent_id, include_deleted)
            .await
    }

    /// Gets an entry by id. Returns `None` for entries that do not exist,
    /// belong to another owner, or (unless `include_deleted`) are
    /// soft-deleted.
    pub async fn get(
        &self,
        owner_id: UserId,
        id: EntryId,
        include_deleted: bool,
    ) -> AppResult<Option<Entry>> {
        let Some(entry) = self.repo.find(id).await? else {
            return Ok(None);
        };
        if guard::check_ownership(&entry, owner_id).is_err() {
            return Ok(None);
        }
        if entry.is_deleted && !include_deleted {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Resolves the root-first breadcrumb trail for an entry, ending with
    /// the entry itself.
    pub async fn breadcrumbs(&self, owner_id: UserId, id: EntryId) -> AppResult<Vec<Breadcrumb>> {
        let entry = self.fetch_owned(owner_id, id, false).await?;
        let chain = path::ancestors_of(self.repo.as_ref(), id).await?;

        let mut trail = Breadcrumb::trail(&chain);
        trail.push(Breadcrumb::from(&entry));
        Ok(trail)
    }

    /// Fetch an entry the actor owns.
    ///
    /// Owner mismatch reads as `NotFound`, the same as a missing id, so
    /// the existence of another user's entries is never leaked.
    async fn fetch_owned(
        &self,
        actor_id: UserId,
        id: EntryId,
        include_deleted: bool,
    ) -> AppResult<Entry> {
        let entry = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;

        if guard::check_ownership(&entry, actor_id).is_err() {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        if entry.is_deleted && !include_deleted {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(entry)
    }

    /// Resolve a target parent into its full ancestor chain (root-first,
    /// including the parent itself). Empty for root-level targets.
    async fn resolve_parent_chain(
        &self,
        actor_id: UserId,
        parent_id: Option<EntryId>,
    ) -> AppResult<Vec<Entry>> {
        let Some(parent_id) = parent_id else {
            return Ok(Vec::new());
        };

        let parent = self
            .repo
            .find(parent_id)
            .await?
            .ok_or_else(|| AppError::invalid_parent("Parent entry not found"))?;
        guard::check_parent(&parent, actor_id)?;

        let mut chain = path::ancestors_of(self.repo.as_ref(), parent_id).await?;
        chain.push(parent);
        Ok(chain)
    }

    /// Reject a target path already occupied by a different live entry.
    async fn check_path_free(
        &self,
        owner_id: UserId,
        entry_id: EntryId,
        new_path: &str,
    ) -> AppResult<()> {
        if let Some(existing) = self.repo.find_by_path(owner_id, new_path).await? {
            if existing.id != entry_id {
                return Err(AppError::conflict(format!(
                    "An entry at path '{new_path}' already exists"
                )));
            }
        }
        Ok(())
    }
}
