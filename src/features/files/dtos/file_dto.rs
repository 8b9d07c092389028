use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::{FilePermission, FileRecord, FileType};
use crate::shared::constants::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_LIMIT};

/// Upload request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFilesDto {
    /// One part per file; repeat the field for batch uploads
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Vec<String>,
    /// Target directory, defaults to "/"
    #[schema(example = "/docs")]
    pub path: Option<String>,
}

/// Response DTO for a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    pub name: String,
    /// Virtual parent directory
    pub path: String,
    pub file_type: FileType,
    pub provider: String,
    pub size: i64,
    pub mime_type: Option<String>,
    /// URL to access the bytes; absent for folders
    pub url: Option<String>,
    pub owner_id: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(f: FileRecord) -> Self {
        let file_type = if f.is_folder() {
            FileType::Folder
        } else {
            FileType::File
        };
        Self {
            id: f.id,
            name: f.name,
            path: f.path,
            file_type,
            provider: f.provider,
            size: f.size,
            mime_type: f.mime_type,
            url: f.url,
            owner_id: f.owner_id,
            metadata: f.metadata,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// A permission row granted to the requesting user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FilePermissionDto {
    pub user_id: String,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

impl From<FilePermission> for FilePermissionDto {
    fn from(p: FilePermission) -> Self {
        Self {
            user_id: p.user_id,
            permission: p.permission,
            created_at: p.created_at,
        }
    }
}

/// Catalog entry with the caller's permission rows attached
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileDetailDto {
    #[serde(flatten)]
    pub file: FileResponseDto,
    /// Only present when the request carried an owner id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<FilePermissionDto>>,
}

/// Query parameters for listing a directory
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Directory to list (default: "/")
    pub path: Option<String>,
    /// Page number (1-indexed, default: 1)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page (default: 20, max: 100)
    #[serde(default = "default_limit")]
    #[param(minimum = 1, maximum = 100)]
    pub limit: i64,
    /// Restrict to "file" or "folder"
    #[serde(rename = "type")]
    pub file_type: Option<FileType>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListFilesQuery {
    fn default() -> Self {
        Self {
            path: None,
            page: default_page(),
            limit: default_limit(),
            file_type: None,
        }
    }
}

/// One page of a directory listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListDto {
    pub files: Vec<FileResponseDto>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

/// Query parameters for name search
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchFilesQuery {
    /// Case-insensitive substring of the entry name
    pub q: String,
    /// Only entries directly in this directory
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<FileType>,
    /// Maximum results (default: 50, max: 100)
    #[serde(default = "default_search_limit")]
    #[param(minimum = 1, maximum = 100)]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

/// Request DTO for renaming an entry or replacing its metadata
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFileDto {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::ENTRY_NAME_REGEX",
            message = "name must not contain path separators or be a dot segment"
        )
    )]
    pub name: Option<String>,
    /// Replaces the stored metadata object
    pub metadata: Option<Value>,
}

/// Request DTO for creating a folder
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFolderDto {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1-255 characters"),
        regex(
            path = "*crate::shared::validation::ENTRY_NAME_REGEX",
            message = "name must not contain path separators or be a dot segment"
        )
    )]
    #[schema(example = "reports")]
    pub name: String,
    /// Parent directory (default: "/")
    #[schema(example = "/docs")]
    pub path: Option<String>,
}

/// Request DTO for moving an entry to another directory
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MoveFileDto {
    #[validate(length(min = 1, message = "new_path is required"))]
    #[schema(example = "/archive")]
    pub new_path: String,
}

/// A blob that could not be stored, keyed by its original filename
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadErrorDto {
    pub filename: String,
    pub error: String,
}

/// Outcome of a batch upload
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UploadReportDto {
    pub files: Vec<FileResponseDto>,
    pub errors: Vec<UploadErrorDto>,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Number of catalog entries soft-deleted (the entry plus folder descendants)
    pub deleted: u64,
}

/// Response DTO carrying only the access URL of a file
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileUrlDto {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_list_query_defaults() {
        let query: ListFilesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert!(query.path.is_none());

        let query: ListFilesQuery =
            serde_json::from_value(serde_json::json!({ "type": "folder" })).unwrap();
        assert_eq!(query.file_type, Some(FileType::Folder));
    }

    #[test]
    fn test_folder_name_validation() {
        let ok = CreateFolderDto {
            name: "reports 2024".to_string(),
            path: None,
        };
        assert!(ok.validate().is_ok());

        for bad in ["", "a/b", "..", "."] {
            let dto = CreateFolderDto {
                name: bad.to_string(),
                path: None,
            };
            assert!(dto.validate().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_detail_flattens_file_fields() {
        let now = Utc::now();
        let detail = FileDetailDto {
            file: FileResponseDto {
                id: Uuid::new_v4(),
                name: "a.txt".to_string(),
                path: "/".to_string(),
                file_type: FileType::File,
                provider: "local".to_string(),
                size: 3,
                mime_type: Some("text/plain".to_string()),
                url: Some("/uploads/a.txt".to_string()),
                owner_id: None,
                metadata: serde_json::json!({}),
                created_at: now,
                updated_at: now,
            },
            permissions: None,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["name"], "a.txt");
        assert_eq!(value["file_type"], "file");
        assert!(value.get("permissions").is_none());
    }
}
