use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    activate_storage_config, create_storage_config, delete_storage_config,
    get_active_storage_config, get_storage_config, list_storage_configs,
    test_storage_connection, update_storage_config,
};
use super::services::StorageSettingsService;

/// Create routes for the storage settings registry
pub fn routes(service: Arc<StorageSettingsService>) -> Router {
    Router::new()
        .route(
            "/api/storage-settings",
            get(list_storage_configs).post(create_storage_config),
        )
        .route("/api/storage-settings/active", get(get_active_storage_config))
        .route(
            "/api/storage-settings/{id}",
            get(get_storage_config)
                .put(update_storage_config)
                .delete(delete_storage_config),
        )
        .route(
            "/api/storage-settings/{id}/activate",
            post(activate_storage_config),
        )
        .route("/api/storage-settings/{id}/test", post(test_storage_connection))
        .with_state(service)
}
