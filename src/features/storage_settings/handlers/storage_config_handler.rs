use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::storage_settings::dtos::{
    CreateStorageConfigDto, StorageConfigResponseDto, TestConnectionResponseDto,
    UpdateStorageConfigDto,
};
use crate::features::storage_settings::services::StorageSettingsService;
use crate::shared::types::{ApiResponse, Meta};

/// List all storage configurations
#[utoipa::path(
    get,
    path = "/api/storage-settings",
    responses(
        (status = 200, description = "List of storage configurations", body = ApiResponse<Vec<StorageConfigResponseDto>>)
    ),
    tag = "storage-settings"
)]
pub async fn list_storage_configs(
    State(service): State<Arc<StorageSettingsService>>,
) -> Result<Json<ApiResponse<Vec<StorageConfigResponseDto>>>> {
    let configs = service.list_all().await?;
    let total = configs.len() as i64;
    let response: Vec<StorageConfigResponseDto> = configs.into_iter().map(|c| c.into()).collect();

    Ok(Json(ApiResponse::success(
        Some(response),
        None,
        Some(Meta::total(total)),
    )))
}

/// Get the active storage configuration
#[utoipa::path(
    get,
    path = "/api/storage-settings/active",
    responses(
        (status = 200, description = "Active storage configuration, null when none is active", body = ApiResponse<StorageConfigResponseDto>)
    ),
    tag = "storage-settings"
)]
pub async fn get_active_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
) -> Result<Json<ApiResponse<StorageConfigResponseDto>>> {
    let config = service.get_active().await?;

    let message = if config.is_none() {
        Some("No active storage configuration".to_string())
    } else {
        None
    };

    Ok(Json(ApiResponse::success(
        config.map(|c| c.into()),
        message,
        None,
    )))
}

/// Get a storage configuration by id
#[utoipa::path(
    get,
    path = "/api/storage-settings/{id}",
    params(
        ("id" = Uuid, Path, description = "Storage configuration ID")
    ),
    responses(
        (status = 200, description = "Storage configuration", body = ApiResponse<StorageConfigResponseDto>),
        (status = 404, description = "Configuration not found")
    ),
    tag = "storage-settings"
)]
pub async fn get_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StorageConfigResponseDto>>> {
    let config = service.get_by_id(id).await?;

    Ok(Json(ApiResponse::success(Some(config.into()), None, None)))
}

/// Create a storage configuration
#[utoipa::path(
    post,
    path = "/api/storage-settings",
    request_body = CreateStorageConfigDto,
    responses(
        (status = 201, description = "Storage configuration created", body = ApiResponse<StorageConfigResponseDto>),
        (status = 400, description = "Validation error or unsupported provider")
    ),
    tag = "storage-settings"
)]
pub async fn create_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
    AppJson(dto): AppJson<CreateStorageConfigDto>,
) -> Result<(StatusCode, Json<ApiResponse<StorageConfigResponseDto>>)> {
    let config = service.create(dto).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(config.into()),
            Some("Storage configuration created".to_string()),
            None,
        )),
    ))
}

/// Update a storage configuration
#[utoipa::path(
    put,
    path = "/api/storage-settings/{id}",
    params(
        ("id" = Uuid, Path, description = "Storage configuration ID")
    ),
    request_body = UpdateStorageConfigDto,
    responses(
        (status = 200, description = "Updated storage configuration", body = ApiResponse<StorageConfigResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Configuration not found")
    ),
    tag = "storage-settings"
)]
pub async fn update_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateStorageConfigDto>,
) -> Result<Json<ApiResponse<StorageConfigResponseDto>>> {
    let config = service.update(id, dto).await?;

    Ok(Json(ApiResponse::success(Some(config.into()), None, None)))
}

/// Delete an inactive storage configuration
#[utoipa::path(
    delete,
    path = "/api/storage-settings/{id}",
    params(
        ("id" = Uuid, Path, description = "Storage configuration ID")
    ),
    responses(
        (status = 200, description = "Storage configuration deleted"),
        (status = 404, description = "Configuration not found"),
        (status = 409, description = "Configuration is active")
    ),
    tag = "storage-settings"
)]
pub async fn delete_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;

    Ok(Json(ApiResponse::success(
        None,
        Some("Storage configuration deleted".to_string()),
        None,
    )))
}

/// Make a storage configuration the active one
#[utoipa::path(
    post,
    path = "/api/storage-settings/{id}/activate",
    params(
        ("id" = Uuid, Path, description = "Storage configuration ID")
    ),
    responses(
        (status = 200, description = "Activated storage configuration", body = ApiResponse<StorageConfigResponseDto>),
        (status = 404, description = "Configuration not found")
    ),
    tag = "storage-settings"
)]
pub async fn activate_storage_config(
    State(service): State<Arc<StorageSettingsService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StorageConfigResponseDto>>> {
    let config = service.activate(id).await?;

    Ok(Json(ApiResponse::success(
        Some(config.into()),
        Some("Storage configuration activated".to_string()),
        None,
    )))
}

/// Check connectivity of a storage configuration
#[utoipa::path(
    post,
    path = "/api/storage-settings/{id}/test",
    params(
        ("id" = Uuid, Path, description = "Storage configuration ID")
    ),
    responses(
        (status = 200, description = "Connection test outcome", body = ApiResponse<TestConnectionResponseDto>),
        (status = 404, description = "Configuration not found")
    ),
    tag = "storage-settings"
)]
pub async fn test_storage_connection(
    State(service): State<Arc<StorageSettingsService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TestConnectionResponseDto>>> {
    let result = service.test_connection(id).await?;

    Ok(Json(ApiResponse::success(Some(result), None, None)))
}
