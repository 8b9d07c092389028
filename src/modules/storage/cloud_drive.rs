//! Cloud drive storage provider
//!
//! Accepts and validates a cloud drive configuration so it can be stored and
//! selected like any other backend, but no remote client is wired in yet:
//! operations that must report failure return `NotImplemented`, the rest
//! return the contract's "did not happen" sentinels.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{AppError, Result};
use crate::modules::storage::provider::{
    ObjectMetadata, ProviderKind, StorageProvider, StoredObject, UploadBlob, UploadLimits,
};
use crate::shared::path::sanitize_path;

/// Persisted shape of a cloud drive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDriveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Drive folder that acts as the storage root
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(flatten)]
    pub limits: UploadLimits,
}

pub struct CloudDriveProvider {
    config: CloudDriveConfig,
}

impl CloudDriveProvider {
    pub fn new(config: CloudDriveConfig) -> Self {
        Self { config }
    }

    fn not_implemented(operation: &str) -> AppError {
        AppError::NotImplemented(format!(
            "Cloud drive storage does not support '{}' yet",
            operation
        ))
    }
}

#[async_trait]
impl StorageProvider for CloudDriveProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CloudDrive
    }

    fn limits(&self) -> &UploadLimits {
        &self.config.limits
    }

    async fn upload(&self, blob: &UploadBlob, _dest_path: &str) -> Result<StoredObject> {
        self.validate_blob(blob)?;
        Err(Self::not_implemented("upload"))
    }

    async fn delete(&self, path: &str) -> bool {
        warn!("{}", Self::not_implemented(&format!("delete {}", path)));
        false
    }

    fn get_url(&self, path: &str) -> String {
        let folder = self.config.folder_id.as_deref().unwrap_or("root");
        format!("gdrive://{}/{}", folder, sanitize_path(path))
    }

    async fn exists(&self, _path: &str) -> bool {
        false
    }

    async fn move_file(&self, from: &str, to: &str) -> bool {
        warn!("{}", Self::not_implemented(&format!("move {} -> {}", from, to)));
        false
    }

    async fn copy_file(&self, from: &str, to: &str) -> bool {
        warn!("{}", Self::not_implemented(&format!("copy {} -> {}", from, to)));
        false
    }

    async fn list(&self, _path: &str, _recursive: bool) -> Result<Vec<String>> {
        Err(Self::not_implemented("list"))
    }

    async fn get_metadata(&self, _path: &str) -> Option<ObjectMetadata> {
        None
    }

    async fn test_connection(&self) -> Result<()> {
        Err(Self::not_implemented("test connection"))
    }
}
