use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::error::{AppError, Result};
use crate::modules::storage::cloud_drive::{CloudDriveConfig, CloudDriveProvider};
use crate::modules::storage::local::{LocalDiskProvider, LocalStorageConfig};
use crate::modules::storage::object_storage::{ObjectStorageConfig, ObjectStorageProvider};
use crate::modules::storage::provider::{ProviderKind, StorageProvider, UploadLimits};

fn parse_config<T: DeserializeOwned>(kind: ProviderKind, config: &Value) -> Result<T> {
    serde_json::from_value(config.clone()).map_err(|e| {
        AppError::Validation(format!("Invalid '{}' storage configuration: {}", kind, e))
    })
}

/// Check that `config` has the shape `provider` expects, returning its upload limits
pub fn validate_config(provider: &str, config: &Value) -> Result<UploadLimits> {
    let kind = ProviderKind::parse(provider)?;
    let limits = match kind {
        ProviderKind::Local => parse_config::<LocalStorageConfig>(kind, config)?.limits,
        ProviderKind::ObjectStorage => parse_config::<ObjectStorageConfig>(kind, config)?.limits,
        ProviderKind::CloudDrive => parse_config::<CloudDriveConfig>(kind, config)?.limits,
    };

    if limits.max_file_size == 0 {
        return Err(AppError::Validation(
            "maxFileSize must be greater than zero".to_string(),
        ));
    }
    if limits.max_files_per_upload == 0 {
        return Err(AppError::Validation(
            "maxFilesPerUpload must be greater than zero".to_string(),
        ));
    }

    Ok(limits)
}

/// Build the provider for a persisted discriminator and configuration blob
pub fn create_provider(provider: &str, config: &Value) -> Result<Arc<dyn StorageProvider>> {
    let kind = ProviderKind::parse(provider)?;
    let provider: Arc<dyn StorageProvider> = match kind {
        ProviderKind::Local => Arc::new(LocalDiskProvider::new(parse_config(kind, config)?)),
        ProviderKind::ObjectStorage => {
            Arc::new(ObjectStorageProvider::new(parse_config(kind, config)?)?)
        }
        ProviderKind::CloudDrive => Arc::new(CloudDriveProvider::new(parse_config(kind, config)?)),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dispatch_by_discriminator() {
        let local = create_provider("local", &json!({ "basePath": "/tmp/x" })).unwrap();
        assert_eq!(local.kind(), ProviderKind::Local);

        let s3 = create_provider(
            "s3",
            &json!({
                "endpoint": "http://localhost:9000",
                "accessKey": "a",
                "secretKey": "b",
                "bucket": "files"
            }),
        )
        .unwrap();
        assert_eq!(s3.kind(), ProviderKind::ObjectStorage);

        let drive = create_provider(
            "google_drive",
            &json!({ "clientId": "a", "clientSecret": "b", "refreshToken": "c" }),
        )
        .unwrap();
        assert_eq!(drive.kind(), ProviderKind::CloudDrive);
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            create_provider("dropbox", &json!({})),
            Err(AppError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_malformed_config_is_validation_error() {
        assert!(matches!(
            create_provider("s3", &json!({ "endpoint": 12 })),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_config("local", &json!({ "maxFileSize": 0 })),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_config_returns_limits() {
        let limits = validate_config(
            "local",
            &json!({ "maxFileSize": 2048, "allowedMimeTypes": ["image/png"] }),
        )
        .unwrap();
        assert_eq!(limits.max_file_size, 2048);
        assert_eq!(limits.allowed_mime_types, vec!["image/png".to_string()]);
    }
}
