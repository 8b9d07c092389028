//! Storage provider contract
//!
//! Every backend (local disk, S3-compatible object storage, cloud drive)
//! implements [`StorageProvider`]. The file catalog and the storage settings
//! registry only ever talk to `Arc<dyn StorageProvider>`.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::core::config::StorageDefaultsConfig;
use crate::core::error::{AppError, Result};
use crate::shared::validation::UNSAFE_NAME_CHARS;

/// Discriminator of a storage backend, persisted as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProviderKind {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "s3")]
    ObjectStorage,
    #[serde(rename = "google_drive")]
    CloudDrive,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Local,
        ProviderKind::ObjectStorage,
        ProviderKind::CloudDrive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::ObjectStorage => "s3",
            ProviderKind::CloudDrive => "google_drive",
        }
    }

    /// Parse a persisted discriminator; anything outside the closed set is rejected
    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AppError::UnsupportedProvider(value.to_string()))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and type limits shared by every provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLimits {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
    #[serde(default = "default_max_files_per_upload")]
    pub max_files_per_upload: usize,
}

fn default_max_file_size() -> u64 {
    StorageDefaultsConfig::DEFAULT_MAX_FILE_SIZE
}

fn default_max_files_per_upload() -> usize {
    StorageDefaultsConfig::DEFAULT_MAX_FILES_PER_UPLOAD
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_mime_types: Vec::new(),
            max_files_per_upload: default_max_files_per_upload(),
        }
    }
}

/// An in-memory blob handed to the catalog by an upload endpoint
#[derive(Debug, Clone)]
pub struct UploadBlob {
    /// Original filename as sent by the client
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadBlob {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Result of a successful provider write
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub url: String,
    /// Provider-relative path the bytes were written to
    pub path: String,
    pub size: u64,
    pub metadata: Map<String, Value>,
}

/// Metadata reported by a provider for a stored object
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ObjectMetadata {
    pub path: String,
    pub size: u64,
    pub mime_type: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub is_dir: bool,
}

/// Capability set every storage backend implements.
///
/// `delete`, `exists`, `move_file`, `copy_file` and `get_metadata` never fail:
/// I/O problems are logged and reported as `false`/`None`, which callers read
/// as "did not happen". `upload` propagates its errors.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn limits(&self) -> &UploadLimits;

    /// Shared preconditions, checked before any I/O
    fn validate_blob(&self, blob: &UploadBlob) -> Result<()> {
        validate_blob(self.limits(), blob)
    }

    async fn upload(&self, blob: &UploadBlob, dest_path: &str) -> Result<StoredObject>;

    async fn delete(&self, path: &str) -> bool;

    fn get_url(&self, path: &str) -> String;

    async fn exists(&self, path: &str) -> bool;

    async fn move_file(&self, from: &str, to: &str) -> bool;

    async fn copy_file(&self, from: &str, to: &str) -> bool;

    /// Direct children of `path`, or the whole subtree when `recursive`
    async fn list(&self, path: &str, recursive: bool) -> Result<Vec<String>>;

    async fn get_metadata(&self, path: &str) -> Option<ObjectMetadata>;

    /// Round-trip a marker object to prove the backend is reachable and writable
    async fn test_connection(&self) -> Result<()>;
}

pub fn validate_blob(limits: &UploadLimits, blob: &UploadBlob) -> Result<()> {
    if blob.name.trim().is_empty() {
        return Err(AppError::Validation("File name is required".to_string()));
    }

    if blob.size() > limits.max_file_size {
        return Err(AppError::Validation(format!(
            "File '{}' is too large ({} bytes). Maximum size is {} bytes",
            blob.name,
            blob.size(),
            limits.max_file_size
        )));
    }

    if !limits.allowed_mime_types.is_empty()
        && !limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&blob.mime_type))
    {
        return Err(AppError::Validation(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            blob.mime_type,
            limits.allowed_mime_types.join(", ")
        )));
    }

    Ok(())
}

static LAST_NAME_TOKEN: AtomicI64 = AtomicI64::new(0);

/// Millisecond wall-clock token, strictly increasing within this process
fn next_name_token() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_NAME_TOKEN
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(previous + 1)
}

/// Build a collision-avoiding storage name from an uploaded filename.
///
/// `"My Photo.PNG"` becomes `"my_photo_<millis>.png"`.
pub fn generate_safe_name(original: &str) -> String {
    let file_name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    let (stem, extension) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], Some(&file_name[idx + 1..])),
        _ => (file_name, None),
    };

    let lowered = stem.to_lowercase();
    let base = UNSAFE_NAME_CHARS.replace_all(&lowered, "_");
    let base = base.trim_matches('_');
    let base = if base.is_empty() { "file" } else { base };

    let extension: Option<String> = extension
        .map(|ext| {
            ext.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty());

    let token = next_name_token();
    match extension {
        Some(ext) => format!("{}_{}.{}", base, token, ext),
        None => format!("{}_{}", base, token),
    }
}
