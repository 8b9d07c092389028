use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::storage_settings::models::{
    NewStorageConfig, StorageConfig, StorageConfigChanges,
};

/// Advisory lock key serializing activation changes across processes
const ACTIVATION_LOCK_KEY: i64 = 0x5354_4f52_4147_4531;

const COLUMNS: &str =
    "id, provider, name, description, config, is_active, created_at, updated_at";

/// Persistence for storage configurations.
///
/// Implementations keep "at most one active row" atomic: activation and
/// insert-as-active deactivate every other row in the same step.
#[async_trait]
pub trait StorageConfigRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<StorageConfig>>;

    /// Most recently updated active configuration
    async fn find_active(&self) -> Result<Option<StorageConfig>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageConfig>>;

    async fn insert(&self, new: NewStorageConfig, activate: bool) -> Result<StorageConfig>;

    /// Apply `changes`; `is_active = Some(true)` deactivates every other row
    async fn update(
        &self,
        id: Uuid,
        changes: StorageConfigChanges,
    ) -> Result<Option<StorageConfig>>;

    /// Make `id` the only active configuration
    async fn activate(&self, id: Uuid) -> Result<Option<StorageConfig>>;

    /// Delete `id` unless it is active; returns whether a row was removed
    async fn delete_inactive(&self, id: Uuid) -> Result<bool>;
}

pub struct PgStorageConfigRepository {
    pool: PgPool,
}

impl PgStorageConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Row-lock `id` for the rest of the transaction; false when it does not exist
    async fn lock_row(tx: &mut sqlx::Transaction<'_, Postgres>, id: Uuid) -> Result<bool> {
        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM storage_configs WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(locked.is_some())
    }

    /// Serialize activation changes; held until the transaction ends.
    /// Always taken before any row lock.
    async fn acquire_activation_lock(tx: &mut sqlx::Transaction<'_, Postgres>) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ACTIVATION_LOCK_KEY)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn deactivate_others(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        keep: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE storage_configs
            SET is_active = FALSE, updated_at = NOW()
            WHERE is_active = TRUE AND ($1::uuid IS NULL OR id <> $1)
            "#,
        )
        .bind(keep)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StorageConfigRepository for PgStorageConfigRepository {
    async fn list_all(&self) -> Result<Vec<StorageConfig>> {
        let configs = sqlx::query_as::<_, StorageConfig>(&format!(
            "SELECT {} FROM storage_configs ORDER BY created_at DESC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list storage configs: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(configs)
    }

    async fn find_active(&self) -> Result<Option<StorageConfig>> {
        let config = sqlx::query_as::<_, StorageConfig>(&format!(
            "SELECT {} FROM storage_configs WHERE is_active = TRUE ORDER BY updated_at DESC LIMIT 1",
            COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageConfig>> {
        let config = sqlx::query_as::<_, StorageConfig>(&format!(
            "SELECT {} FROM storage_configs WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn insert(&self, new: NewStorageConfig, activate: bool) -> Result<StorageConfig> {
        let mut tx = self.pool.begin().await?;

        if activate {
            Self::acquire_activation_lock(&mut tx).await?;
            Self::deactivate_others(&mut tx, None).await?;
        }

        let config = sqlx::query_as::<_, StorageConfig>(&format!(
            r#"
            INSERT INTO storage_configs (provider, name, description, config, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&new.provider)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.config)
        .bind(activate)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(config)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: StorageConfigChanges,
    ) -> Result<Option<StorageConfig>> {
        let mut tx = self.pool.begin().await?;
        let activating = changes.is_active == Some(true);

        if activating {
            Self::acquire_activation_lock(&mut tx).await?;
        }

        if !Self::lock_row(&mut tx, id).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        if activating {
            Self::deactivate_others(&mut tx, Some(id)).await?;
        }

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE storage_configs SET updated_at = NOW()");
        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(config) = changes.config {
            query.push(", config = ").push_bind(config);
        }
        if let Some(is_active) = changes.is_active {
            query.push(", is_active = ").push_bind(is_active);
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {}", COLUMNS));

        let config = query
            .build_query_as::<StorageConfig>()
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(config)
    }

    async fn activate(&self, id: Uuid) -> Result<Option<StorageConfig>> {
        let mut tx = self.pool.begin().await?;
        Self::acquire_activation_lock(&mut tx).await?;

        if !Self::lock_row(&mut tx, id).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        Self::deactivate_others(&mut tx, Some(id)).await?;

        let config = sqlx::query_as::<_, StorageConfig>(&format!(
            r#"
            UPDATE storage_configs
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(config))
    }

    async fn delete_inactive(&self, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM storage_configs WHERE id = $1 AND is_active = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
