//! File-system entry model.
//!
//! A single `entries` table holds both files and folders as a
//! self-referential tree per owner. The `path` column is materialized from
//! ancestor names and kept consistent by the service layer on every rename
//! and move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use drivebox_core::types::{EntryId, UserId};

/// MIME type sentinel used for folder entries.
pub const FOLDER_MIME_TYPE: &str = "folder";

/// Default MIME type for files created without an explicit classifier.
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// A file or folder in the per-owner entry tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entry {
    /// Unique entry identifier, immutable after creation.
    pub id: EntryId,
    /// The entry owner, immutable after creation.
    pub owner_id: UserId,
    /// Parent entry ID (`None` for root-level entries).
    pub parent_id: Option<EntryId>,
    /// Display name.
    pub name: String,
    /// Full materialized path (e.g., `/documents/reports/q3.pdf`).
    pub path: String,
    /// File size in bytes; always `0` for folders.
    pub size_bytes: i64,
    /// MIME type; [`FOLDER_MIME_TYPE`] for folders.
    pub mime_type: String,
    /// Opaque reference to the stored content; `None` for folders.
    pub storage_url: Option<String>,
    /// Whether this entry is a folder. The kind of an entry never changes.
    pub is_folder: bool,
    /// Whether the owner has starred this entry.
    pub is_starred: bool,
    /// Soft-delete flag. Deleted entries stay in the table until purged.
    pub is_deleted: bool,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Check if this is a root-level entry (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data required to create a new entry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    /// The entry owner.
    pub owner_id: UserId,
    /// Parent entry (None for root-level).
    pub parent_id: Option<EntryId>,
    /// Display name.
    pub name: String,
    /// Full materialized path.
    pub path: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub mime_type: String,
    /// Opaque content reference.
    pub storage_url: Option<String>,
    /// Whether the new entry is a folder.
    pub is_folder: bool,
}

impl NewEntry {
    /// Build a new folder record. Folders carry no content and no size.
    pub fn folder(
        owner_id: UserId,
        parent_id: Option<EntryId>,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            parent_id,
            name: name.into(),
            path: path.into(),
            size_bytes: 0,
            mime_type: FOLDER_MIME_TYPE.to_string(),
            storage_url: None,
            is_folder: true,
        }
    }

    /// Build a new file record.
    pub fn file(
        owner_id: UserId,
        parent_id: Option<EntryId>,
        name: impl Into<String>,
        path: impl Into<String>,
        size_bytes: i64,
        mime_type: Option<String>,
        storage_url: Option<String>,
    ) -> Self {
        Self {
            owner_id,
            parent_id,
            name: name.into(),
            path: path.into(),
            size_bytes,
            mime_type: mime_type.unwrap_or_else(|| DEFAULT_FILE_MIME_TYPE.to_string()),
            storage_url,
            is_folder: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_record_has_no_content() {
        let record = NewEntry::folder(UserId::new(), None, "Docs", "/Docs");
        assert!(record.is_folder);
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.mime_type, FOLDER_MIME_TYPE);
        assert!(record.storage_url.is_none());
    }

    #[test]
    fn test_file_record_defaults_mime_type() {
        let record = NewEntry::file(
            UserId::new(),
            None,
            "a.bin",
            "/a.bin",
            42,
            None,
            Some("s3://bucket/a".to_string()),
        );
        assert!(!record.is_folder);
        assert_eq!(record.mime_type, DEFAULT_FILE_MIME_TYPE);
    }
}
