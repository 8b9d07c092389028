//! Local disk storage provider
//!
//! All paths are resolved under one configured root directory. Files are
//! served by the HTTP layer under `/uploads/<relative-path>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::config::StorageDefaultsConfig;
use crate::core::error::{AppError, Result};
use crate::modules::storage::provider::{
    ObjectMetadata, ProviderKind, StorageProvider, StoredObject, UploadBlob, UploadLimits,
};
use crate::shared::constants::{CONNECTION_TEST_MARKER, LOCAL_URL_PREFIX};
use crate::shared::path::{has_parent_segment, join_storage, sanitize_path};

/// Persisted shape of a local storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStorageConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(flatten)]
    pub limits: UploadLimits,
    #[serde(default)]
    pub enable_thumbnails: bool,
}

fn default_base_path() -> String {
    StorageDefaultsConfig::DEFAULT_BASE_PATH.to_string()
}

impl From<&StorageDefaultsConfig> for LocalStorageConfig {
    fn from(defaults: &StorageDefaultsConfig) -> Self {
        Self {
            base_path: defaults.base_path.clone(),
            limits: UploadLimits {
                max_file_size: defaults.max_file_size,
                allowed_mime_types: defaults.allowed_mime_types.clone(),
                max_files_per_upload: defaults.max_files_per_upload,
            },
            enable_thumbnails: false,
        }
    }
}

pub struct LocalDiskProvider {
    root: PathBuf,
    limits: UploadLimits,
}

impl LocalDiskProvider {
    pub fn new(config: LocalStorageConfig) -> Self {
        Self {
            root: PathBuf::from(config.base_path),
            limits: config.limits,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a provider-relative path onto the disk, refusing to leave the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if has_parent_segment(path) {
            return Err(AppError::Validation(format!(
                "Path '{}' must not contain '..' segments",
                path
            )));
        }

        let relative = sanitize_path(path);
        if relative.is_empty() {
            Ok(self.root.clone())
        } else {
            Ok(self.root.join(relative))
        }
    }

    async fn ensure_parent(target: &Path) -> std::io::Result<()> {
        match target.parent() {
            Some(parent) => tokio::fs::create_dir_all(parent).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StorageProvider for LocalDiskProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    async fn upload(&self, blob: &UploadBlob, dest_path: &str) -> Result<StoredObject> {
        self.validate_blob(blob)?;

        let relative = sanitize_path(dest_path);
        if relative.is_empty() {
            return Err(AppError::Validation(
                "Destination path must name a file".to_string(),
            ));
        }
        let target = self.resolve(&relative)?;

        Self::ensure_parent(&target).await.map_err(|e| {
            AppError::StorageIo(format!(
                "Failed to create directory for '{}': {}",
                relative, e
            ))
        })?;

        tokio::fs::write(&target, &blob.data)
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to write '{}': {}", relative, e)))?;

        debug!("Wrote {} bytes to '{}'", blob.size(), target.display());

        let mut metadata = Map::new();
        metadata.insert("mimeType".to_string(), json!(blob.mime_type));
        metadata.insert("storage".to_string(), Value::String("local".to_string()));

        Ok(StoredObject {
            url: self.get_url(&relative),
            path: relative,
            size: blob.size(),
            metadata,
        })
    }

    async fn delete(&self, path: &str) -> bool {
        let target = match self.resolve(path) {
            Ok(target) => target,
            Err(e) => {
                warn!("Refusing to delete '{}': {}", path, e);
                return false;
            }
        };

        let result = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&target).await,
            Ok(_) => tokio::fs::remove_file(&target).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            // already absent
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to delete '{}': {}", target.display(), e);
                false
            }
        }
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}/{}", LOCAL_URL_PREFIX, sanitize_path(path))
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(target) => tokio::fs::try_exists(&target).await.unwrap_or_else(|e| {
                warn!("Failed to check '{}': {}", target.display(), e);
                false
            }),
            Err(_) => false,
        }
    }

    async fn move_file(&self, from: &str, to: &str) -> bool {
        let (source, target) = match (self.resolve(from), self.resolve(to)) {
            (Ok(source), Ok(target)) => (source, target),
            _ => {
                warn!("Refusing to move '{}' to '{}'", from, to);
                return false;
            }
        };

        if tokio::fs::try_exists(&target).await.unwrap_or(true) {
            warn!("Refusing to move '{}': '{}' already exists", from, to);
            return false;
        }

        if let Err(e) = Self::ensure_parent(&target).await {
            warn!("Failed to prepare '{}': {}", target.display(), e);
            return false;
        }

        match tokio::fs::rename(&source, &target).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to move '{}' to '{}': {}",
                    source.display(),
                    target.display(),
                    e
                );
                false
            }
        }
    }

    async fn copy_file(&self, from: &str, to: &str) -> bool {
        let (source, target) = match (self.resolve(from), self.resolve(to)) {
            (Ok(source), Ok(target)) => (source, target),
            _ => {
                warn!("Refusing to copy '{}' to '{}'", from, to);
                return false;
            }
        };

        if tokio::fs::try_exists(&target).await.unwrap_or(true) {
            warn!("Refusing to copy '{}': '{}' already exists", from, to);
            return false;
        }

        if let Err(e) = Self::ensure_parent(&target).await {
            warn!("Failed to prepare '{}': {}", target.display(), e);
            return false;
        }

        match tokio::fs::copy(&source, &target).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Failed to copy '{}' to '{}': {}",
                    source.display(),
                    target.display(),
                    e
                );
                false
            }
        }
    }

    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        self.resolve(path)?;

        let mut entries = Vec::new();
        let mut pending = vec![sanitize_path(path)];

        while let Some(relative_dir) = pending.pop() {
            let dir = self.resolve(&relative_dir)?;
            let mut reader = match tokio::fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(AppError::StorageIo(format!(
                        "Failed to list '{}': {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = reader.next_entry().await.map_err(|e| {
                AppError::StorageIo(format!("Failed to list '{}': {}", dir.display(), e))
            })? {
                let name = entry.file_name().to_string_lossy().to_string();
                let relative = join_storage(&relative_dir, &name);

                if recursive {
                    let is_dir = entry
                        .file_type()
                        .await
                        .map(|t| t.is_dir())
                        .unwrap_or(false);
                    if is_dir {
                        pending.push(relative.clone());
                    }
                }

                entries.push(relative);
            }
        }

        entries.sort();
        Ok(entries)
    }

    async fn get_metadata(&self, path: &str) -> Option<ObjectMetadata> {
        let target = self.resolve(path).ok()?;

        match tokio::fs::metadata(&target).await {
            Ok(meta) => Some(ObjectMetadata {
                path: sanitize_path(path),
                size: if meta.is_dir() { 0 } else { meta.len() },
                mime_type: None,
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
                is_dir: meta.is_dir(),
            }),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to stat '{}': {}", target.display(), e);
                }
                None
            }
        }
    }

    async fn test_connection(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::StorageIo(format!(
                "Cannot create storage directory '{}': {}",
                self.root.display(),
                e
            ))
        })?;

        let token = Uuid::new_v4().to_string();
        let marker = self
            .root
            .join(format!("{}-{}", CONNECTION_TEST_MARKER, token));

        tokio::fs::write(&marker, token.as_bytes())
            .await
            .map_err(|e| AppError::StorageIo(format!("Cannot write test file: {}", e)))?;

        let read_back = tokio::fs::read(&marker).await;
        // the marker must not outlive the check
        let removed = tokio::fs::remove_file(&marker).await;

        let read_back =
            read_back.map_err(|e| AppError::StorageIo(format!("Cannot read test file: {}", e)))?;
        removed.map_err(|e| AppError::StorageIo(format!("Cannot delete test file: {}", e)))?;

        if read_back != token.as_bytes() {
            return Err(AppError::StorageIo(
                "Test file content did not match what was written".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider(temp: &TempDir, mimes: &[&str]) -> LocalDiskProvider {
        LocalDiskProvider::new(LocalStorageConfig {
            base_path: temp.path().join("uploads").display().to_string(),
            limits: UploadLimits {
                max_file_size: 1024,
                allowed_mime_types: mimes.iter().map(|m| m.to_string()).collect(),
                max_files_per_upload: 5,
            },
            enable_thumbnails: false,
        })
    }

    fn blob(name: &str, size: usize) -> UploadBlob {
        UploadBlob::new(name, "image/png", vec![7; size])
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: LocalStorageConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.base_path, "./uploads");
        assert_eq!(config.limits, UploadLimits::default());
        assert!(!config.enable_thumbnails);
    }

    #[test]
    fn test_config_reads_camel_case() {
        let config: LocalStorageConfig = serde_json::from_value(json!({
            "basePath": "/srv/files",
            "maxFileSize": 2048,
            "allowedMimeTypes": ["image/png"],
            "maxFilesPerUpload": 3,
            "enableThumbnails": true
        }))
        .unwrap();
        assert_eq!(config.base_path, "/srv/files");
        assert_eq!(config.limits.max_file_size, 2048);
        assert_eq!(config.limits.max_files_per_upload, 3);
        assert!(config.enable_thumbnails);
    }

    #[tokio::test]
    async fn test_upload_writes_under_root() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);

        let stored = provider
            .upload(&blob("a.png", 16), "//docs//a_1.png")
            .await
            .unwrap();

        assert_eq!(stored.path, "docs/a_1.png");
        assert_eq!(stored.url, "/uploads/docs/a_1.png");
        assert_eq!(stored.size, 16);
        let on_disk = provider.root().join("docs/a_1.png");
        assert_eq!(std::fs::read(on_disk).unwrap().len(), 16);
        assert!(provider.exists("docs/a_1.png").await);
    }

    #[tokio::test]
    async fn test_upload_rejects_parent_segments() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);

        let result = provider.upload(&blob("a.png", 4), "../escape.png").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let nested = provider.upload(&blob("a.png", 4), "docs/../../escape.png").await;
        assert!(matches!(nested, Err(AppError::Validation(_))));

        assert!(!temp.path().join("escape.png").exists());
        assert!(!provider.delete("../uploads").await);
        assert!(!provider.exists("../uploads").await);
        assert!(provider.list("..", true).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_enforces_limits_before_io() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &["image/jpeg"]);

        let too_big = provider.upload(&blob("a.png", 2048), "a.png").await;
        assert!(matches!(too_big, Err(AppError::Validation(_))));

        let wrong_type = provider.upload(&blob("a.png", 8), "a.png").await;
        assert!(matches!(wrong_type, Err(AppError::Validation(_))));

        assert!(!provider.root().exists());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);
        provider.upload(&blob("a.png", 4), "a.png").await.unwrap();

        assert!(provider.delete("a.png").await);
        assert!(!provider.exists("a.png").await);
        // already absent is still success
        assert!(provider.delete("a.png").await);
    }

    #[tokio::test]
    async fn test_move_and_copy() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);
        provider.upload(&blob("a.png", 4), "a.png").await.unwrap();

        assert!(provider.copy_file("a.png", "backup/a.png").await);
        assert!(provider.exists("a.png").await);
        assert!(provider.exists("backup/a.png").await);

        assert!(provider.move_file("a.png", "moved/deep/a.png").await);
        assert!(!provider.exists("a.png").await);
        assert!(provider.exists("moved/deep/a.png").await);

        assert!(!provider.move_file("missing.png", "x.png").await);
        assert!(!provider.copy_file("missing.png", "x.png").await);
    }

    #[tokio::test]
    async fn test_move_and_copy_never_overwrite() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);
        provider.upload(&blob("a.png", 4), "a.png").await.unwrap();
        provider.upload(&blob("b.png", 9), "docs/b.png").await.unwrap();

        assert!(!provider.move_file("a.png", "docs/b.png").await);
        assert!(!provider.copy_file("a.png", "docs/b.png").await);

        assert!(provider.exists("a.png").await);
        let kept = provider.get_metadata("docs/b.png").await.unwrap();
        assert_eq!(kept.size, 9);
    }

    #[tokio::test]
    async fn test_list_direct_and_recursive() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);
        provider.upload(&blob("a", 1), "a.png").await.unwrap();
        provider.upload(&blob("b", 1), "docs/b.png").await.unwrap();
        provider.upload(&blob("c", 1), "docs/2024/c.png").await.unwrap();

        let direct = provider.list("/", false).await.unwrap();
        assert_eq!(direct, vec!["a.png".to_string(), "docs".to_string()]);

        let all = provider.list("", true).await.unwrap();
        assert_eq!(
            all,
            vec![
                "a.png".to_string(),
                "docs".to_string(),
                "docs/2024".to_string(),
                "docs/2024/c.png".to_string(),
                "docs/b.png".to_string(),
            ]
        );

        let missing = provider.list("nothing-here", true).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_get_metadata() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);
        provider.upload(&blob("a", 12), "docs/a.png").await.unwrap();

        let meta = provider.get_metadata("/docs/a.png").await.unwrap();
        assert_eq!(meta.path, "docs/a.png");
        assert_eq!(meta.size, 12);
        assert!(!meta.is_dir);
        assert!(meta.modified_at.is_some());

        assert!(provider.get_metadata("docs").await.unwrap().is_dir);
        assert!(provider.get_metadata("missing.png").await.is_none());
        assert!(provider.get_metadata("../etc/passwd").await.is_none());
    }

    #[tokio::test]
    async fn test_connection_round_trip_leaves_no_marker() {
        let temp = TempDir::new().unwrap();
        let provider = provider(&temp, &[]);

        tokio_test::assert_ok!(provider.test_connection().await);
        assert!(provider.list("", true).await.unwrap().is_empty());
    }
}
