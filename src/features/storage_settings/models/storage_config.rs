use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a named storage backend configuration
#[derive(Debug, Clone, FromRow)]
pub struct StorageConfig {
    pub id: Uuid,
    pub provider: String,
    pub name: String,
    pub description: Option<String>,
    pub config: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a storage configuration that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewStorageConfig {
    pub provider: String,
    pub name: String,
    pub description: Option<String>,
    pub config: Value,
}

/// Partial update of a storage configuration; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct StorageConfigChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<Value>,
    pub is_active: Option<bool>,
}

impl StorageConfigChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.config.is_none()
            && self.is_active.is_none()
    }
}
