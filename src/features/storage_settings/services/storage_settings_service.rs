use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::core::config::StorageDefaultsConfig;
use crate::core::error::{AppError, Result};
use crate::features::storage_settings::dtos::{
    CreateStorageConfigDto, TestConnectionResponseDto, UpdateStorageConfigDto,
};
use crate::features::storage_settings::models::{
    NewStorageConfig, StorageConfig, StorageConfigChanges,
};
use crate::features::storage_settings::repositories::StorageConfigRepository;
use crate::modules::storage::{
    create_provider, validate_config, LocalStorageConfig, ProviderKind, StorageProvider,
};

/// Registry of named storage configurations with a single active backend
pub struct StorageSettingsService {
    repository: Arc<dyn StorageConfigRepository>,
    defaults: StorageDefaultsConfig,
    /// Serializes every change to which configuration is active
    activation_lock: Mutex<()>,
}

impl StorageSettingsService {
    pub fn new(
        repository: Arc<dyn StorageConfigRepository>,
        defaults: StorageDefaultsConfig,
    ) -> Self {
        Self {
            repository,
            defaults,
            activation_lock: Mutex::new(()),
        }
    }

    /// List all storage configurations, newest first
    pub async fn list_all(&self) -> Result<Vec<StorageConfig>> {
        self.repository.list_all().await
    }

    /// Get the active storage configuration, if any
    pub async fn get_active(&self) -> Result<Option<StorageConfig>> {
        self.repository.find_active().await
    }

    /// Get a storage configuration by id
    pub async fn get_by_id(&self, id: Uuid) -> Result<StorageConfig> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Storage config '{}' not found", id)))
    }

    /// Create a storage configuration, optionally making it the active one
    pub async fn create(&self, dto: CreateStorageConfigDto) -> Result<StorageConfig> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
        validate_config(&dto.provider, &dto.config)?;

        let new = NewStorageConfig {
            provider: dto.provider,
            name: dto.name.trim().to_string(),
            description: dto.description,
            config: dto.config,
        };

        let config = if dto.is_active {
            let _guard = self.activation_lock.lock().await;
            self.repository.insert(new, true).await?
        } else {
            self.repository.insert(new, false).await?
        };

        info!(
            "Storage config created: id={}, provider={}, active={}",
            config.id, config.provider, config.is_active
        );

        Ok(config)
    }

    /// Apply a partial update to a storage configuration
    pub async fn update(&self, id: Uuid, dto: UpdateStorageConfigDto) -> Result<StorageConfig> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

        let existing = self.get_by_id(id).await?;
        if let Some(config) = &dto.config {
            validate_config(&existing.provider, config)?;
        }

        let changes = StorageConfigChanges {
            name: dto.name.map(|n| n.trim().to_string()),
            description: dto.description,
            config: dto.config,
            is_active: dto.is_active,
        };
        if changes.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let updated = if changes.is_active.is_some() {
            let _guard = self.activation_lock.lock().await;
            self.repository.update(id, changes).await?
        } else {
            self.repository.update(id, changes).await?
        };

        let updated = updated
            .ok_or_else(|| AppError::NotFound(format!("Storage config '{}' not found", id)))?;

        info!(
            "Storage config updated: id={}, active={}",
            updated.id, updated.is_active
        );

        Ok(updated)
    }

    /// Delete an inactive storage configuration
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.activation_lock.lock().await;

        let existing = self.get_by_id(id).await?;
        if existing.is_active {
            return Err(AppError::ActiveConfigInUse(format!(
                "Storage config '{}' is active and cannot be deleted",
                existing.name
            )));
        }

        if !self.repository.delete_inactive(id).await? {
            // activated or removed since the lookup above
            return match self.repository.find_by_id(id).await? {
                Some(_) => Err(AppError::ActiveConfigInUse(format!(
                    "Storage config '{}' is active and cannot be deleted",
                    existing.name
                ))),
                None => Err(AppError::NotFound(format!(
                    "Storage config '{}' not found",
                    id
                ))),
            };
        }

        info!("Storage config deleted: id={}", id);
        Ok(())
    }

    /// Make `id` the only active storage configuration
    pub async fn activate(&self, id: Uuid) -> Result<StorageConfig> {
        let _guard = self.activation_lock.lock().await;

        let config = self
            .repository
            .activate(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Storage config '{}' not found", id)))?;

        info!(
            "Storage config activated: id={}, provider={}",
            config.id, config.provider
        );

        Ok(config)
    }

    /// Check that the backend described by `id` is reachable and writable
    pub async fn test_connection(&self, id: Uuid) -> Result<TestConnectionResponseDto> {
        let config = self.get_by_id(id).await?;
        let provider = create_provider(&config.provider, &config.config)?;

        let result = match provider.test_connection().await {
            Ok(()) => TestConnectionResponseDto {
                success: true,
                provider: config.provider.clone(),
                message: "Connection successful".to_string(),
            },
            Err(e) => {
                warn!(
                    "Storage connection test failed for config {}: {}",
                    config.id, e
                );
                TestConnectionResponseDto {
                    success: false,
                    provider: config.provider.clone(),
                    message: e.to_string(),
                }
            }
        };

        Ok(result)
    }

    /// Return the active configuration, persisting a local-disk default when none is active
    pub async fn ensure_default(&self) -> Result<StorageConfig> {
        if let Some(active) = self.repository.find_active().await? {
            return Ok(active);
        }

        let _guard = self.activation_lock.lock().await;

        // another caller may have created it while we waited
        if let Some(active) = self.repository.find_active().await? {
            return Ok(active);
        }

        let local = LocalStorageConfig::from(&self.defaults);
        let config = serde_json::to_value(&local)
            .map_err(|e| AppError::Internal(format!("Failed to encode default config: {}", e)))?;

        let created = self
            .repository
            .insert(
                NewStorageConfig {
                    provider: ProviderKind::Local.as_str().to_string(),
                    name: "Local Storage".to_string(),
                    description: Some("Default local disk storage".to_string()),
                    config,
                },
                true,
            )
            .await?;

        info!(
            "Default local storage config created: id={}, base_path={}",
            created.id, local.base_path
        );

        Ok(created)
    }

    /// Provider for the active configuration (creating the default if needed)
    pub async fn active_provider(&self) -> Result<(StorageConfig, Arc<dyn StorageProvider>)> {
        let config = self.ensure_default().await?;
        let provider = create_provider(&config.provider, &config.config)?;
        debug!(
            "Resolved active storage provider: {} ({})",
            config.provider, config.id
        );
        Ok((config, provider))
    }

    /// Local root directory of the active configuration, if it is a local one
    pub async fn active_local_root(&self) -> Result<Option<String>> {
        let config = self.ensure_default().await?;
        if ProviderKind::parse(&config.provider)? != ProviderKind::Local {
            return Ok(None);
        }
        let local: LocalStorageConfig = serde_json::from_value::<LocalStorageConfig>(
            config.config.clone(),
        )
        .map_err(|e| AppError::Validation(format!("Invalid local storage configuration: {}", e)))?;
        Ok(Some(local.base_path))
    }
}
