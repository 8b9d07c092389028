use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::features::storage_settings::{
    dtos as storage_settings_dtos, handlers as storage_settings_handlers,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::list_files,
        files_handlers::search_files,
        files_handlers::get_file,
        files_handlers::get_file_url,
        files_handlers::update_file,
        files_handlers::delete_file,
        files_handlers::move_file,
        files_handlers::create_folder,
        files_handlers::upload_files,
        // Storage settings
        storage_settings_handlers::list_storage_configs,
        storage_settings_handlers::get_active_storage_config,
        storage_settings_handlers::get_storage_config,
        storage_settings_handlers::create_storage_config,
        storage_settings_handlers::update_storage_config,
        storage_settings_handlers::delete_storage_config,
        storage_settings_handlers::activate_storage_config,
        storage_settings_handlers::test_storage_connection,
    ),
    components(
        schemas(
            Meta,
            // Files
            files_models::FileType,
            files_dtos::FileResponseDto,
            files_dtos::FileDetailDto,
            files_dtos::FilePermissionDto,
            files_dtos::FileListDto,
            files_dtos::FileUrlDto,
            files_dtos::UpdateFileDto,
            files_dtos::CreateFolderDto,
            files_dtos::MoveFileDto,
            files_dtos::UploadFilesDto,
            files_dtos::UploadErrorDto,
            files_dtos::UploadReportDto,
            files_dtos::DeleteFileResponseDto,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<files_dtos::FileDetailDto>,
            ApiResponse<files_dtos::FileListDto>,
            ApiResponse<files_dtos::UploadReportDto>,
            // Storage settings
            storage_settings_dtos::CreateStorageConfigDto,
            storage_settings_dtos::UpdateStorageConfigDto,
            storage_settings_dtos::StorageConfigResponseDto,
            storage_settings_dtos::TestConnectionResponseDto,
            ApiResponse<storage_settings_dtos::StorageConfigResponseDto>,
            ApiResponse<storage_settings_dtos::TestConnectionResponseDto>,
        )
    ),
    tags(
        (name = "files", description = "File catalog: upload, browse, move and delete files and folders"),
        (name = "storage-settings", description = "Storage provider configurations and the active backend"),
    ),
    modifiers(&OwnerIdAddon),
    info(
        title = "Berkas API",
        version = "0.1.0",
        description = "File catalog and storage settings API",
    )
)]
pub struct ApiDoc;

/// Documents the optional `x-owner-id` caller header
struct OwnerIdAddon;

impl Modify for OwnerIdAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "owner_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    crate::shared::constants::OWNER_ID_HEADER,
                    "Caller id used for owner scoping; omit for trusted internal calls",
                ))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/files",
            "/api/files/search",
            "/api/files/upload",
            "/api/files/folders",
            "/api/files/{id}",
            "/api/files/{id}/url",
            "/api/files/{id}/move",
            "/api/storage-settings",
            "/api/storage-settings/active",
            "/api/storage-settings/{id}",
            "/api/storage-settings/{id}/activate",
            "/api/storage-settings/{id}/test",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("owner_id"));
        assert!(components.schemas.contains_key("Meta"));
        assert!(components
            .schemas
            .keys()
            .any(|name| name.starts_with("ApiResponse")));
    }
}
