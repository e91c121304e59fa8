//! The persistence seam for the entry tree.
//!
//! [`EntryRepository`] is the narrow interface the service layer depends
//! on. Every mutation that touches more than one row — a path cascade, a
//! tree-wide soft delete — derives the affected subtree *inside* its own
//! transactional scope and commits atomically, so a concurrent mutation
//! on the same subtree can never interleave with a cascade in progress
//! or leave partial writes behind.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use drivebox_core::result::AppResult;
use drivebox_core::types::{EntryId, UserId};
use drivebox_entity::entry::{Entry, NewEntry};

/// Transactional storage for entry rows.
#[async_trait]
pub trait EntryRepository: Send + Sync + 'static {
    /// Insert a new entry, assigning its id and timestamps.
    ///
    /// Re-validates the parent inside the same transactional scope as the
    /// insert: fails with `InvalidParent` when `parent_id` no longer
    /// references a live folder of the same owner, and with `Conflict`
    /// when a live entry of the same owner already occupies the target
    /// path. The service layer checks both up front; this is the
    /// authoritative check against writes that land in between.
    async fn insert(&self, data: &NewEntry) -> AppResult<Entry>;

    /// Find an entry by id, regardless of owner or deletion state.
    async fn find(&self, id: EntryId) -> AppResult<Option<Entry>>;

    /// Find a live (not soft-deleted) entry by owner and materialized path.
    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Entry>>;

    /// List immediate children of a parent (or root-level entries when
    /// `parent_id` is `None`), ordered by name ascending.
    async fn children(
        &self,
        owner_id: UserId,
        parent_id: Option<EntryId>,
        include_deleted: bool,
    ) -> AppResult<Vec<Entry>>;

    /// Persist a renamed or moved root entry and rewrite the paths of its
    /// entire subtree, atomically. The descendant set is derived inside
    /// the transaction, so children created while the caller was
    /// preparing the mutation are rewritten too. Returns the stored root.
    async fn apply_subtree_paths(&self, root: &Entry) -> AppResult<Entry>;

    /// Flip the soft-delete flag on a single entry (restore path).
    async fn set_deleted(&self, id: EntryId, deleted: bool) -> AppResult<()>;

    /// Soft-delete an entry and every descendant in one atomic operation,
    /// walking the subtree inside the transactional scope. Returns the
    /// number of entries marked.
    async fn set_deleted_subtree(&self, id: EntryId) -> AppResult<u64>;

    /// Set the starred flag on a single entry.
    async fn set_starred(&self, id: EntryId, starred: bool) -> AppResult<()>;

    /// Permanently remove an owner's soft-deleted entries. Only ever
    /// touches rows with `is_deleted = true`; intended for an external
    /// batch job. Returns the number of rows purged.
    async fn purge_deleted(&self, owner_id: UserId) -> AppResult<u64>;
}
