use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::storage_settings::models::StorageConfig;

/// Config keys whose values never leave the service
const SECRET_KEYS: &[&str] = &["secretKey", "accessKey", "clientSecret", "refreshToken"];

const REDACTED: &str = "********";

/// Request DTO for creating a storage configuration
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStorageConfigDto {
    /// Provider discriminator: "local", "s3" or "google_drive"
    #[validate(length(min = 1, message = "provider is required"))]
    #[schema(example = "local")]
    pub provider: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    /// Provider-specific settings (credentials, root path, limits)
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default)]
    pub is_active: bool,
}

/// Request DTO for a partial update of a storage configuration
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStorageConfigDto {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "description must be at most 500 characters"))]
    pub description: Option<String>,
    pub config: Option<Value>,
    pub is_active: Option<bool>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Response DTO for a storage configuration; secrets are redacted
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StorageConfigResponseDto {
    pub id: Uuid,
    pub provider: String,
    pub name: String,
    pub description: Option<String>,
    pub config: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StorageConfig> for StorageConfigResponseDto {
    fn from(c: StorageConfig) -> Self {
        Self {
            id: c.id,
            provider: c.provider,
            name: c.name,
            description: c.description,
            config: redact_secrets(c.config),
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

fn redact_secrets(config: Value) -> Value {
    match config {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SECRET_KEYS.contains(&key.as_str()) && !value.is_null() {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, value)
                    }
                })
                .collect(),
        ),
        other => other,
    }
}

/// Result of a storage connectivity check
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestConnectionResponseDto {
    pub success: bool,
    pub provider: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secrets_are_redacted() {
        let redacted = redact_secrets(json!({
            "endpoint": "http://minio:9000",
            "accessKey": "AKIA",
            "secretKey": "shh",
            "bucket": "files"
        }));
        assert_eq!(redacted["endpoint"], "http://minio:9000");
        assert_eq!(redacted["accessKey"], REDACTED);
        assert_eq!(redacted["secretKey"], REDACTED);
        assert_eq!(redacted["bucket"], "files");
    }

    #[test]
    fn test_create_dto_validation() {
        let dto: CreateStorageConfigDto =
            serde_json::from_value(json!({ "provider": "local", "name": "" })).unwrap();
        assert!(dto.validate().is_err());

        let dto: CreateStorageConfigDto =
            serde_json::from_value(json!({ "provider": "local", "name": "Disk" })).unwrap();
        assert!(dto.validate().is_ok());
        assert!(!dto.is_active);
        assert_eq!(dto.config, json!({}));
    }
}
