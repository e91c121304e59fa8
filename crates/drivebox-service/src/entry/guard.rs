//! Integrity checks applied before every tree mutation.
//!
//! Each check validates one invariant of the entry tree: names stay
//! usable as path segments, parents are live folders of the same owner,
//! and no reparent ever makes an entry its own ancestor. The entry store
//! runs these before touching the repository, so a failed check aborts
//! with no partial writes.

use drivebox_core::error::AppError;
use drivebox_core::result::AppResult;
use drivebox_core::types::{EntryId, UserId};
use drivebox_entity::entry::Entry;

/// Validate an entry name: non-empty after trimming, and free of the
/// path separator so it cannot corrupt materialized paths.
pub fn check_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_name("Entry name cannot be empty"));
    }
    if name.contains('/') {
        return Err(AppError::invalid_name("Entry name cannot contain '/'"));
    }
    Ok(())
}

/// Ensure the actor owns the entry.
pub fn check_ownership(entry: &Entry, actor_id: UserId) -> AppResult<()> {
    if entry.owner_id != actor_id {
        return Err(AppError::forbidden(format!(
            "Entry {} is not owned by the caller",
            entry.id
        )));
    }
    Ok(())
}

/// Ensure a candidate parent can hold children: a live folder owned by
/// the same user.
pub fn check_parent(parent: &Entry, owner_id: UserId) -> AppResult<()> {
    if parent.owner_id != owner_id {
        return Err(AppError::invalid_parent("Parent entry not found"));
    }
    if !parent.is_folder {
        return Err(AppError::invalid_parent(format!(
            "Entry {} is not a folder",
            parent.id
        )));
    }
    if parent.is_deleted {
        return Err(AppError::invalid_parent(format!(
            "Folder {} is deleted",
            parent.id
        )));
    }
    Ok(())
}

/// Reject a reparent that would create a cycle.
///
/// `new_parent_chain` is the target parent's ancestor chain root-first,
/// including the target parent itself. If the entry being moved appears
/// anywhere in it, the move would make the entry its own ancestor.
pub fn check_reparent(entry_id: EntryId, new_parent_chain: &[Entry]) -> AppResult<()> {
    if new_parent_chain.iter().any(|e| e.id == entry_id) {
        return Err(AppError::cycle_detected(
            "Cannot move an entry into itself or one of its descendants",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use drivebox_core::error::ErrorKind;

    fn folder(owner_id: UserId) -> Entry {
        let now = Utc::now();
        Entry {
            id: EntryId::new(),
            owner_id,
            parent_id: None,
            name: "Docs".to_string(),
            path: "/Docs".to_string(),
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
    fn test_check_name_rejects_empty_and_separator() {
        assert_eq!(check_name("  ").unwrap_err().kind, ErrorKind::InvalidName);
        assert_eq!(check_name("a/b").unwrap_err().kind, ErrorKind::InvalidName);
        assert!(check_name("report.pdf").is_ok());
    }

    #[test]
    fn test_check_ownership() {
        let owner = UserId::new();
        let entry = folder(owner);
        assert!(check_ownership(&entry, owner).is_ok());
        assert_eq!(
            check_ownership(&entry, UserId::new()).unwrap_err().kind,
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_check_parent_rejects_files_and_deleted_folders() {
        let owner = UserId::new();

        let mut file = folder(owner);
        file.is_folder = false;
        assert_eq!(
            check_parent(&file, owner).unwrap_err().kind,
            ErrorKind::InvalidParent
        );

        let mut deleted = folder(owner);
        deleted.is_deleted = true;
        assert_eq!(
            check_parent(&deleted, owner).unwrap_err().kind,
            ErrorKind::InvalidParent
        );

        assert_eq!(
            check_parent(&folder(owner), UserId::new()).unwrap_err().kind,
            ErrorKind::InvalidParent
        );
    }

    #[test]
    fn test_check_reparent_detects_descendant_target() {
        let owner = UserId::new();
        let moved = folder(owner);
        let target_parent = folder(owner);

        let chain = vec![moved.clone(), target_parent];
        assert_eq!(
            check_reparent(moved.id, &chain).unwrap_err().kind,
            ErrorKind::CycleDetected
        );
        assert!(check_reparent(EntryId::new(), &chain).is_ok());
    }
}
