//! PostgreSQL-backed entry repository.

use sqlx::PgPool;

use drivebox_core::error::{AppError, ErrorKind};
use drivebox_core::result::AppResult;
use drivebox_core::types::{EntryId, UserId};
use drivebox_entity::entry::{Entry, NewEntry};

use super::EntryRepository;

/// Name of the partial unique index guarding per-owner path uniqueness.
const PATH_UNIQUE_CONSTRAINT: &str = "entries_owner_id_path_key";

/// Entry repository backed by PostgreSQL.
///
/// Subtree cascades run inside a single transaction and derive the
/// affected subtree server-side with `WITH RECURSIVE`, so the set of
/// rows rewritten is always the subtree as of the transaction itself,
/// not an earlier snapshot.
#[derive(Debug, Clone)]
pub struct PgEntryRepository {
    pool: PgPool,
}

impl PgEntryRepository {
    /// Create a new repository over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_path_conflict(err: sqlx::Error, path: &str, context: &str) -> AppError {
        match err {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some(PATH_UNIQUE_CONSTRAINT) =>
            {
                AppError::conflict(format!("An entry at path '{path}' already exists"))
            }
            _ => AppError::with_source(ErrorKind::Database, context.to_string(), err),
        }
    }

    fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
        move |e| AppError::with_source(ErrorKind::Database, context.to_string(), e)
    }
}

#[async_trait::async_trait]
impl EntryRepository for PgEntryRepository {
    async fn insert(&self, data: &NewEntry) -> AppResult<Entry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(Self::db_error("Failed to begin transaction"))?;

        // Lock the parent row and re-check it inside the transaction, so
        // a subtree delete committed after the caller's checks cannot
        // gain a live child.
        if let Some(parent_id) = data.parent_id {
            let parent: Option<(UserId, bool, bool)> = sqlx::query_as(
                "SELECT owner_id, is_folder, is_deleted FROM entries WHERE id = $1 FOR UPDATE",
            )
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Self::db_error("Failed to check parent entry"))?;

            match parent {
                None => return Err(AppError::invalid_parent("Parent entry not found")),
                Some((owner_id, _, _)) if owner_id != data.owner_id => {
                    return Err(AppError::invalid_parent("Parent entry not found"));
                }
                Some((_, false, _)) => {
                    return Err(AppError::invalid_parent(format!(
                        "Entry {parent_id} is not a folder"
                    )));
                }
                Some((_, _, true)) => {
                    return Err(AppError::invalid_parent(format!(
                        "Folder {parent_id} is deleted"
                    )));
                }
                Some(_) => {}
            }
        }

        let entry = sqlx::query_as::<_, Entry>(
            "INSERT INTO entries \
                (owner_id, parent_id, name, path, size_bytes, mime_type, storage_url, is_folder) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.size_bytes)
        .bind(&data.mime_type)
        .bind(&data.storage_url)
        .bind(data.is_folder)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_path_conflict(e, &data.path, "Failed to insert entry"))?;

        tx.commit()
            .await
            .map_err(Self::db_error("Failed to commit insert"))?;

        Ok(entry)
    }

    async fn find(&self, id: EntryId) -> AppResult<Option<Entry>> {
        sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_error("Failed to find entry"))
    }

    async fn find_by_path(&self, owner_id: UserId, path: &str) -> AppResult<Option<Entry>> {
        sqlx::query_as::<_, Entry>(
            "SELECT * FROM entries WHERE owner_id = $1 AND path = $2 AND NOT is_deleted",
        )
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_error("Failed to find entry by path"))
    }

    async fn children(
        &self,
        owner_id: UserId,
        parent_id: Option<EntryId>,
        include_deleted: bool,
    ) -> AppResult<Vec<Entry>> {
        let query = match (parent_id, include_deleted) {
            (Some(_), false) => {
                "SELECT * FROM entries \
                 WHERE owner_id = $1 AND parent_id = $2 AND NOT is_deleted ORDER BY name ASC"
            }
            (Some(_), true) => {
                "SELECT * FROM entries \
                 WHERE owner_id = $1 AND parent_id = $2 ORDER BY name ASC"
            }
            (None, false) => {
                "SELECT * FROM entries \
                 WHERE owner_id = $1 AND parent_id IS NULL AND NOT is_deleted ORDER BY name ASC"
            }
            (None, true) => {
                "SELECT * FROM entries \
                 WHERE owner_id = $1 AND parent_id IS NULL ORDER BY name ASC"
            }
        };

        let mut q = sqlx::query_as::<_, Entry>(query).bind(owner_id);
        if let Some(parent) = parent_id {
            q = q.bind(parent);
        }
        q.fetch_all(&self.pool)
            .await
            .map_err(Self::db_error("Failed to list children"))
    }

    async fn apply_subtree_paths(&self, root: &Entry) -> AppResult<Entry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(Self::db_error("Failed to begin transaction"))?;

        // Locking the root row serializes concurrent cascades on the
        // same subtree; the stored path is the prefix to rewrite.
        let old_path: String =
            sqlx::query_scalar("SELECT path FROM entries WHERE id = $1 FOR UPDATE")
                .bind(root.id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Self::db_error("Failed to lock entry"))?
                .ok_or_else(|| AppError::not_found(format!("Entry {} not found", root.id)))?;

        let stored = sqlx::query_as::<_, Entry>(
            "UPDATE entries SET name = $2, parent_id = $3, path = $4, updated_at = $5 \
             WHERE id = $1 RETURNING *",
        )
        .bind(root.id)
        .bind(&root.name)
        .bind(root.parent_id)
        .bind(&root.path)
        .bind(root.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_path_conflict(e, &root.path, "Failed to update entry"))?;

        if old_path != root.path {
            sqlx::query(
                "WITH RECURSIVE subtree AS ( \
                    SELECT id FROM entries WHERE id = $1 \
                    UNION ALL \
                    SELECT e.id FROM entries e INNER JOIN subtree s ON e.parent_id = s.id \
                 ) UPDATE entries \
                   SET path = $3 || substr(entries.path, length($2) + 1), updated_at = $4 \
                   FROM subtree WHERE entries.id = subtree.id AND entries.id != $1",
            )
            .bind(root.id)
            .bind(&old_path)
            .bind(&root.path)
            .bind(root.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Self::map_path_conflict(e, &root.path, "Failed to update descendant paths")
            })?;
        }

        tx.commit()
            .await
            .map_err(Self::db_error("Failed to commit path updates"))?;

        Ok(stored)
    }

    async fn set_deleted(&self, id: EntryId, deleted: bool) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE entries SET is_deleted = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(deleted)
                .execute(&self.pool)
                .await
                .map_err(Self::db_error("Failed to update deletion flag"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }

    async fn set_deleted_subtree(&self, id: EntryId) -> AppResult<u64> {
        // A single recursive statement walks and marks the subtree, so
        // there is no window between reading the descendants and
        // flagging them.
        let result = sqlx::query(
            "WITH RECURSIVE subtree AS ( \
                SELECT id FROM entries WHERE id = $1 \
                UNION ALL \
                SELECT e.id FROM entries e INNER JOIN subtree s ON e.parent_id = s.id \
             ) UPDATE entries SET is_deleted = TRUE, updated_at = NOW() \
               FROM subtree WHERE entries.id = subtree.id",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Self::db_error("Failed to soft-delete subtree"))?;

        Ok(result.rows_affected())
    }

    async fn set_starred(&self, id: EntryId, starred: bool) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE entries SET is_starred = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(starred)
                .execute(&self.pool)
                .await
                .map_err(Self::db_error("Failed to update starred flag"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Entry {id} not found")));
        }
        Ok(())
    }

    async fn purge_deleted(&self, owner_id: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE owner_id = $1 AND is_deleted")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Self::db_error("Failed to purge deleted entries"))?;
        Ok(result.rows_affected())
    }
}
