use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::shared::path::join_virtual;

/// Kind of a catalog entry, persisted as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Folder,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::File => "file",
            FileType::Folder => "folder",
        }
    }
}

/// Database model for a catalog entry (file or folder)
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub name: String,
    /// Virtual parent directory (`/`, `/docs`, ...)
    pub path: String,
    pub file_type: String,
    /// Discriminator of the backend that wrote the bytes
    pub provider: String,
    /// Provider-relative key of the bytes; `None` for folders
    pub storage_path: Option<String>,
    pub size: i64,
    pub mime_type: Option<String>,
    pub url: Option<String>,
    pub owner_id: Option<String>,
    pub metadata: Value,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn is_folder(&self) -> bool {
        self.file_type == FileType::Folder.as_str()
    }

    /// Virtual path of the entry itself, e.g. `/docs/2024` for folder `2024` in `/docs`
    pub fn full_path(&self) -> String {
        join_virtual(&self.path, &self.name)
    }
}

/// Database model for a per-user grant on a catalog entry
#[derive(Debug, Clone, FromRow)]
pub struct FilePermission {
    pub id: Uuid,
    pub file_id: Uuid,
    pub user_id: String,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

impl FilePermission {
    /// Whether this grant allows changing the entry
    pub fn allows_write(&self) -> bool {
        matches!(self.permission.as_str(), "write" | "admin")
    }
}

/// Values for a catalog entry that has not been persisted yet
#[derive(Debug, Clone, Validate)]
pub struct NewFileRecord {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::ENTRY_NAME_REGEX",
            message = "name must not contain path separators or be a dot segment"
        )
    )]
    pub name: String,
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    pub file_type: FileType,
    #[validate(length(min = 1, message = "provider is required"))]
    pub provider: String,
    pub storage_path: Option<String>,
    #[validate(range(min = 0, message = "size must not be negative"))]
    pub size: i64,
    pub mime_type: Option<String>,
    pub url: Option<String>,
    pub owner_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl NewFileRecord {
    /// Zero-size folder entry; folders never carry bytes
    pub fn folder(name: String, path: String, provider: String, owner_id: Option<String>) -> Self {
        Self {
            name,
            path,
            file_type: FileType::Folder,
            provider,
            storage_path: None,
            size: 0,
            mime_type: None,
            url: None,
            owner_id,
            metadata: Map::new(),
        }
    }
}

/// Partial update of a catalog entry's name and metadata
#[derive(Debug, Clone, Default)]
pub struct FileChanges {
    pub name: Option<String>,
    pub metadata: Option<Value>,
}

impl FileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.metadata.is_none()
    }
}

/// New location of a moved entry
#[derive(Debug, Clone)]
pub struct FileLocation {
    pub path: String,
    pub storage_path: Option<String>,
    pub url: Option<String>,
}

/// Filters shared by listing and search
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub path: Option<String>,
    pub owner_id: Option<String>,
    pub file_type: Option<FileType>,
}
