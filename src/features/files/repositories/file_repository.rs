use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{
    FileChanges, FileFilter, FileLocation, FilePermission, FileRecord, NewFileRecord,
};
use crate::shared::path::{escape_like, join_virtual};

const COLUMNS: &str = "id, name, path, file_type, provider, storage_path, size, mime_type, url, \
     owner_id, metadata, is_deleted, deleted_at, created_at, updated_at";

/// Persistence for catalog entries.
///
/// Every read filters out soft-deleted rows.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn insert(&self, new: NewFileRecord) -> Result<FileRecord>;

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<FileRecord>>;

    /// Active entry named `name` directly in `path`
    async fn find_active_by_location(&self, path: &str, name: &str)
        -> Result<Option<FileRecord>>;

    /// One page of entries directly in `filter.path`, folders first then newest,
    /// together with the total number of matching entries
    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)>;

    /// Case-insensitive substring match on the entry name
    async fn search(&self, query: &str, filter: &FileFilter, limit: i64)
        -> Result<Vec<FileRecord>>;

    /// Entries whose `path` is `full_path` or lies below it
    async fn find_descendants(&self, full_path: &str) -> Result<Vec<FileRecord>>;

    /// Soft-delete `ids`; returns how many rows changed state
    async fn soft_delete(&self, ids: &[Uuid]) -> Result<u64>;

    async fn update(&self, id: Uuid, changes: FileChanges) -> Result<Option<FileRecord>>;

    async fn update_location(&self, id: Uuid, location: FileLocation)
        -> Result<Option<FileRecord>>;

    /// Move (and optionally rename) a folder, rewriting the path of every
    /// descendant in the same step
    async fn relocate_folder(
        &self,
        id: Uuid,
        new_path: &str,
        new_name: Option<&str>,
    ) -> Result<Option<FileRecord>>;

    async fn permissions_for(&self, file_id: Uuid, user_id: &str) -> Result<Vec<FilePermission>>;
}

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &FileFilter) {
        if let Some(path) = &filter.path {
            query.push(" AND path = ").push_bind(path.clone());
        }
        if let Some(owner_id) = &filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id.clone());
        }
        if let Some(file_type) = filter.file_type {
            query.push(" AND file_type = ").push_bind(file_type.as_str());
        }
    }

    fn subtree_pattern(full_path: &str) -> String {
        format!("{}/%", escape_like(full_path.trim_end_matches('/')))
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn insert(&self, new: NewFileRecord) -> Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            INSERT INTO files (name, path, file_type, provider, storage_path, size, mime_type, url, owner_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.path)
        .bind(new.file_type.as_str())
        .bind(&new.provider)
        .bind(&new.storage_path)
        .bind(new.size)
        .bind(&new.mime_type)
        .bind(&new.url)
        .bind(&new.owner_id)
        .bind(serde_json::Value::Object(new.metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert file record: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(record)
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files WHERE id = $1 AND is_deleted = FALSE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_active_by_location(
        &self,
        path: &str,
        name: &str,
    ) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files WHERE path = $1 AND name = $2 AND is_deleted = FALSE LIMIT 1",
            COLUMNS
        ))
        .bind(path)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM files WHERE is_deleted = FALSE");
        Self::push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM files WHERE is_deleted = FALSE",
            COLUMNS
        ));
        Self::push_filters(&mut query, filter);
        query.push(" ORDER BY (file_type = 'folder') DESC, created_at DESC");
        query.push(" LIMIT ").push_bind(limit);
        query.push(" OFFSET ").push_bind(offset);

        let records = query
            .build_query_as::<FileRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total))
    }

    async fn search(
        &self,
        search: &str,
        filter: &FileFilter,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM files WHERE is_deleted = FALSE AND name ILIKE ",
            COLUMNS
        ));
        query.push_bind(format!("%{}%", escape_like(search)));
        Self::push_filters(&mut query, filter);
        query.push(" ORDER BY (file_type = 'folder') DESC, created_at DESC");
        query.push(" LIMIT ").push_bind(limit);

        let records = query
            .build_query_as::<FileRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    async fn find_descendants(&self, full_path: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            SELECT {} FROM files
            WHERE is_deleted = FALSE AND (path = $1 OR path LIKE $2)
            ORDER BY path, created_at
            "#,
            COLUMNS
        ))
        .bind(full_path)
        .bind(Self::subtree_pattern(full_path))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE files
            SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW()
            WHERE id = ANY($1) AND is_deleted = FALSE
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn update(&self, id: Uuid, changes: FileChanges) -> Result<Option<FileRecord>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE files SET updated_at = NOW()");
        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(metadata) = changes.metadata {
            query.push(", metadata = ").push_bind(metadata);
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND is_deleted = FALSE");
        query.push(format!(" RETURNING {}", COLUMNS));

        let record = query
            .build_query_as::<FileRecord>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn update_location(
        &self,
        id: Uuid,
        location: FileLocation,
    ) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE files
            SET path = $2, storage_path = $3, url = $4, updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&location.path)
        .bind(&location.storage_path)
        .bind(&location.url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn relocate_folder(
        &self,
        id: Uuid,
        new_path: &str,
        new_name: Option<&str>,
    ) -> Result<Option<FileRecord>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        let name = new_name.unwrap_or(&current.name);
        let old_full = current.full_path();
        let new_full = join_virtual(new_path, name);

        let folder = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            UPDATE files
            SET path = $2, name = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(new_path)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        // swap the old prefix for the new one on every descendant
        let moved = sqlx::query(
            r#"
            UPDATE files
            SET path = $2 || substr(path, char_length($1) + 1), updated_at = NOW()
            WHERE is_deleted = FALSE AND (path = $1 OR path LIKE $3)
            "#,
        )
        .bind(&old_full)
        .bind(&new_full)
        .bind(Self::subtree_pattern(&old_full))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            "Folder {} relocated from {} to {} ({} descendants)",
            id,
            old_full,
            new_full,
            moved.rows_affected()
        );

        Ok(Some(folder))
    }

    async fn permissions_for(&self, file_id: Uuid, user_id: &str) -> Result<Vec<FilePermission>> {
        let permissions = sqlx::query_as::<_, FilePermission>(
            r#"
            SELECT id, file_id, user_id, permission, created_at
            FROM file_permissions
            WHERE file_id = $1 AND user_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }
}
