//! S3-compatible object storage provider
//!
//! Works against MinIO or any S3-compatible service through the rust-s3 crate.
//! Objects are stored under an optional key prefix inside one bucket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::modules::storage::provider::{
    ObjectMetadata, ProviderKind, StorageProvider, StoredObject, UploadBlob, UploadLimits,
};
use crate::shared::constants::CONNECTION_TEST_MARKER;
use crate::shared::path::{has_parent_segment, sanitize_path};

/// Persisted shape of an S3-compatible storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Endpoint used in public URLs (defaults to `endpoint`)
    #[serde(default)]
    pub public_endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix for every object written by this provider
    #[serde(default)]
    pub prefix: String,
    #[serde(flatten)]
    pub limits: UploadLimits,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

pub struct ObjectStorageProvider {
    bucket: Box<Bucket>,
    public_endpoint: String,
    prefix: String,
    limits: UploadLimits,
}

impl ObjectStorageProvider {
    /// Build the client. No network round trip happens here.
    pub fn new(config: ObjectStorageConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create S3 credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Internal(format!("Failed to create S3 bucket handle: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let public_endpoint = config
            .public_endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or(config.endpoint)
            .trim_end_matches('/')
            .to_string();

        info!(
            "Object storage provider configured for bucket '{}', prefix '{}'",
            config.bucket, config.prefix
        );

        Ok(Self {
            bucket,
            public_endpoint,
            prefix: sanitize_path(&config.prefix),
            limits: config.limits,
        })
    }

    /// Object key for a provider-relative path
    fn key(&self, path: &str) -> Result<String> {
        if has_parent_segment(path) {
            return Err(AppError::Validation(format!(
                "Path '{}' must not contain '..' segments",
                path
            )));
        }

        let relative = sanitize_path(path);
        Ok(match (self.prefix.is_empty(), relative.is_empty()) {
            (true, _) => relative,
            (false, true) => self.prefix.clone(),
            (false, false) => format!("{}/{}", self.prefix, relative),
        })
    }

    /// Provider-relative path for an object key
    fn relative(&self, key: &str) -> String {
        let key = key.trim_end_matches('/');
        if self.prefix.is_empty() {
            return key.to_string();
        }
        key.strip_prefix(&self.prefix)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or_else(|| key.to_string())
    }

    fn is_success(status: u16) -> bool {
        (200..300).contains(&status)
    }

    async fn head(&self, key: &str) -> Option<ObjectMetadata> {
        match self.bucket.head_object(key).await {
            Ok((head, status)) if Self::is_success(status) => Some(ObjectMetadata {
                path: self.relative(key),
                size: head.content_length.unwrap_or(0).max(0) as u64,
                mime_type: head.content_type,
                modified_at: head
                    .last_modified
                    .as_deref()
                    .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                is_dir: false,
            }),
            Ok((_, status)) => {
                debug!("HEAD '{}' returned status {}", key, status);
                None
            }
            Err(e) => {
                let error_str = e.to_string();
                if !(error_str.contains("404") || error_str.contains("NoSuchKey")) {
                    warn!("Failed to read metadata for '{}': {}", key, e);
                }
                None
            }
        }
    }
}

#[async_trait]
impl StorageProvider for ObjectStorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ObjectStorage
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
        let key = self.key(&relative)?;

        let response = self
            .bucket
            .put_object_with_content_type(&key, &blob.data, &blob.mime_type)
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to upload '{}': {}", key, e)))?;

        if !Self::is_success(response.status_code()) {
            return Err(AppError::StorageIo(format!(
                "Failed to upload '{}': status {}",
                key,
                response.status_code()
            )));
        }

        debug!("Uploaded '{}' to bucket '{}'", key, self.bucket.name());

        let mut metadata = Map::new();
        metadata.insert("mimeType".to_string(), json!(blob.mime_type));
        metadata.insert("bucket".to_string(), json!(self.bucket.name()));
        metadata.insert("key".to_string(), json!(key));

        Ok(StoredObject {
            url: self.get_url(&relative),
            path: relative,
            size: blob.size(),
            metadata,
        })
    }

    async fn delete(&self, path: &str) -> bool {
        let Ok(key) = self.key(path) else {
            return false;
        };

        match self.bucket.delete_object(&key).await {
            // S3 answers 204 for missing keys too
            Ok(response) if Self::is_success(response.status_code()) => true,
            Ok(response) if response.status_code() == 404 => true,
            Ok(response) => {
                warn!(
                    "Failed to delete '{}': status {}",
                    key,
                    response.status_code()
                );
                false
            }
            Err(e) => {
                warn!("Failed to delete '{}': {}", key, e);
                false
            }
        }
    }

    fn get_url(&self, path: &str) -> String {
        let key = self.key(path).unwrap_or_else(|_| sanitize_path(path));
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/{}",
            self.public_endpoint,
            self.bucket.name(),
            encoded
        )
    }

    async fn exists(&self, path: &str) -> bool {
        match self.key(path) {
            Ok(key) => self.head(&key).await.is_some(),
            Err(_) => false,
        }
    }

    async fn move_file(&self, from: &str, to: &str) -> bool {
        if !self.copy_file(from, to).await {
            return false;
        }
        self.delete(from).await
    }

    async fn copy_file(&self, from: &str, to: &str) -> bool {
        let (Ok(source), Ok(target)) = (self.key(from), self.key(to)) else {
            return false;
        };

        if self.head(&target).await.is_some() {
            warn!("Refusing to copy '{}': '{}' already exists", source, target);
            return false;
        }

        match self.bucket.copy_object_internal(&source, &target).await {
            Ok(status) if Self::is_success(status) => true,
            Ok(status) => {
                warn!(
                    "Failed to copy '{}' to '{}': status {}",
                    source, target, status
                );
                false
            }
            Err(e) => {
                warn!("Failed to copy '{}' to '{}': {}", source, target, e);
                false
            }
        }
    }

    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<String>> {
        let key = self.key(path)?;
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{}/", key)
        };
        let delimiter = if recursive {
            None
        } else {
            Some("/".to_string())
        };

        let pages = self
            .bucket
            .list(prefix.clone(), delimiter)
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to list '{}': {}", prefix, e)))?;

        let mut entries: Vec<String> = pages
            .into_iter()
            .flat_map(|page| {
                let folders = page
                    .common_prefixes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| p.prefix);
                let objects = page.contents.into_iter().map(|o| o.key);
                folders.chain(objects).collect::<Vec<_>>()
            })
            .map(|key| self.relative(&key))
            .filter(|relative| !relative.is_empty())
            .collect();

        entries.sort();
        entries.dedup();
        Ok(entries)
    }

    async fn get_metadata(&self, path: &str) -> Option<ObjectMetadata> {
        let key = self.key(path).ok()?;
        self.head(&key).await
    }

    async fn test_connection(&self) -> Result<()> {
        let token = Uuid::new_v4().to_string();
        let marker = format!("{}-{}", CONNECTION_TEST_MARKER, token);
        let key = self.key(&marker)?;

        let put = self
            .bucket
            .put_object_with_content_type(&key, token.as_bytes(), "text/plain")
            .await
            .map_err(|e| AppError::StorageIo(format!("Cannot write test object: {}", e)))?;
        if !Self::is_success(put.status_code()) {
            return Err(AppError::StorageIo(format!(
                "Cannot write test object: status {}",
                put.status_code()
            )));
        }

        let read_back = self.bucket.get_object(&key).await;
        let removed = self.delete(&marker).await;

        let read_back =
            read_back.map_err(|e| AppError::StorageIo(format!("Cannot read test object: {}", e)))?;
        if read_back.bytes().as_ref() != token.as_bytes() {
            return Err(AppError::StorageIo(
                "Test object content did not match what was written".to_string(),
            ));
        }
        if !removed {
            return Err(AppError::StorageIo(
                "Cannot delete test object".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix: &str, public_endpoint: Option<&str>) -> ObjectStorageConfig {
        ObjectStorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            public_endpoint: public_endpoint.map(|e| e.to_string()),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "berkas".to_string(),
            region: default_region(),
            prefix: prefix.to_string(),
            limits: UploadLimits::default(),
        }
    }

    #[test]
    fn test_config_shape() {
        let parsed: ObjectStorageConfig = serde_json::from_value(json!({
            "endpoint": "http://minio:9000",
            "accessKey": "a",
            "secretKey": "b",
            "bucket": "files",
            "maxFileSize": 42
        }))
        .unwrap();
        assert_eq!(parsed.region, "us-east-1");
        assert_eq!(parsed.prefix, "");
        assert_eq!(parsed.limits.max_file_size, 42);

        let missing_bucket = serde_json::from_value::<ObjectStorageConfig>(json!({
            "endpoint": "http://minio:9000",
            "accessKey": "a",
            "secretKey": "b"
        }));
        assert!(missing_bucket.is_err());
    }

    #[test]
    fn test_key_mapping_with_prefix() {
        let provider = ObjectStorageProvider::new(config("/public/", None)).unwrap();
        assert_eq!(provider.key("/docs//a.png").unwrap(), "public/docs/a.png");
        assert_eq!(provider.key("").unwrap(), "public");
        assert_eq!(provider.relative("public/docs/a.png"), "docs/a.png");
        assert!(provider.key("docs/../../x").is_err());
    }

    #[test]
    fn test_urls_use_public_endpoint() {
        let provider =
            ObjectStorageProvider::new(config("", Some("https://cdn.example.com/"))).unwrap();
        assert_eq!(
            provider.get_url("docs/my file.png"),
            "https://cdn.example.com/berkas/docs/my%20file.png"
        );
    }

    #[tokio::test]
    async fn test_rejects_before_network() {
        let provider = ObjectStorageProvider::new(config("", None)).unwrap();
        let blob = UploadBlob::new("a.png", "image/png", vec![1, 2, 3]);

        let escaped = provider.upload(&blob, "../a.png").await;
        assert!(matches!(escaped, Err(AppError::Validation(_))));

        assert!(!provider.delete("../a.png").await);
        assert!(!provider.copy_file("../a.png", "b.png").await);
        assert!(provider.get_metadata("../a.png").await.is_none());
    }
}
