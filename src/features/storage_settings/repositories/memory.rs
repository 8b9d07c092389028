//! In-memory storage configuration repository for tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::storage_settings::models::{
    NewStorageConfig, StorageConfig, StorageConfigChanges,
};
use crate::features::storage_settings::repositories::StorageConfigRepository;

#[derive(Default)]
pub struct InMemoryStorageConfigRepository {
    rows: Mutex<Vec<StorageConfig>>,
}

impl InMemoryStorageConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows flagged active, for invariant checks
    pub fn active_count(&self) -> usize {
        self.rows.lock().unwrap().iter().filter(|c| c.is_active).count()
    }

    fn deactivate_others(rows: &mut [StorageConfig], keep: Option<Uuid>) {
        let now = Utc::now();
        for row in rows.iter_mut() {
            if row.is_active && Some(row.id) != keep {
                row.is_active = false;
                row.updated_at = now;
            }
        }
    }
}

#[async_trait]
impl StorageConfigRepository for InMemoryStorageConfigRepository {
    async fn list_all(&self) -> Result<Vec<StorageConfig>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_active(&self) -> Result<Option<StorageConfig>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|c| c.is_active)
            .max_by_key(|c| c.updated_at)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<StorageConfig>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, new: NewStorageConfig, activate: bool) -> Result<StorageConfig> {
        let mut rows = self.rows.lock().unwrap();
        if activate {
            Self::deactivate_others(&mut rows, None);
        }

        let now = Utc::now();
        let config = StorageConfig {
            id: Uuid::new_v4(),
            provider: new.provider,
            name: new.name,
            description: new.description,
            config: new.config,
            is_active: activate,
            created_at: now,
            updated_at: now,
        };
        rows.push(config.clone());
        Ok(config)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: StorageConfigChanges,
    ) -> Result<Option<StorageConfig>> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.iter().any(|c| c.id == id) {
            return Ok(None);
        }
        if changes.is_active == Some(true) {
            Self::deactivate_others(&mut rows, Some(id));
        }

        let Some(row) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = Some(description);
        }
        if let Some(config) = changes.config {
            row.config = config;
        }
        if let Some(is_active) = changes.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn activate(&self, id: Uuid) -> Result<Option<StorageConfig>> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.iter().any(|c| c.id == id) {
            return Ok(None);
        }
        Self::deactivate_others(&mut rows, Some(id));

        let Some(row) = rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.is_active = true;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_inactive(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id != id || c.is_active);
        Ok(rows.len() < before)
    }
}
