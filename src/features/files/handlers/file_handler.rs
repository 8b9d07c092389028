use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::{AppJson, OwnerId};
use crate::features::files::dtos::{
    CreateFolderDto, DeleteFileResponseDto, FileDetailDto, FileListDto, FileResponseDto,
    FileUrlDto, ListFilesQuery, MoveFileDto, SearchFilesQuery, UpdateFileDto, UploadFilesDto,
    UploadReportDto,
};
use crate::features::files::services::FileService;
use crate::modules::storage::UploadBlob;
use crate::shared::types::{ApiResponse, Meta};

/// List the entries of one directory
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "One page of the directory", body = ApiResponse<FileListDto>),
        (status = 400, description = "Invalid path")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn list_files(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<FileListDto>>, AppError> {
    let listing = service.list_files(query, owner.as_deref()).await?;
    let meta = Meta::paginated(listing.total, listing.page, listing.limit, listing.has_more);

    Ok(Json(ApiResponse::success(Some(listing), None, Some(meta))))
}

/// Search entries by name
#[utoipa::path(
    get,
    path = "/api/files/search",
    tag = "files",
    params(SearchFilesQuery),
    responses(
        (status = 200, description = "Matching entries", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 400, description = "Empty query or invalid path")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn search_files(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Query(query): Query<SearchFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let files = service.search_files(query, owner.as_deref()).await?;
    let total = files.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(files),
        None,
        Some(Meta::total(total)),
    )))
}

/// Get one entry
///
/// With an `x-owner-id` header, the caller's permission rows are included.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Catalog entry", body = ApiResponse<FileDetailDto>),
        (status = 404, description = "File not found")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn get_file(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileDetailDto>>, AppError> {
    let file = service.get_file_by_id(id, owner.as_deref()).await?;

    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Get the access URL of a file
#[utoipa::path(
    get,
    path = "/api/files/{id}/url",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Access URL", body = ApiResponse<FileUrlDto>),
        (status = 400, description = "Entry is a folder"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file_url(
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileUrlDto>>, AppError> {
    let url = service.get_file_url(id).await?;

    Ok(Json(ApiResponse::success(Some(FileUrlDto { url }), None, None)))
}

/// Rename an entry or replace its metadata
#[utoipa::path(
    patch,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = UpdateFileDto,
    responses(
        (status = 200, description = "Updated entry", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not allowed to modify this entry"),
        (status = 404, description = "File not found"),
        (status = 409, description = "Name already taken")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn update_file(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateFileDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.update_file(id, dto, owner.as_deref()).await?;

    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Delete an entry
///
/// Deleting a folder deletes everything below it.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Entry deleted", body = ApiResponse<DeleteFileResponseDto>),
        (status = 403, description = "Not allowed to modify this entry"),
        (status = 404, description = "File not found")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn delete_file(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    let deleted = service.delete_file(id, owner.as_deref()).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted }),
        Some("File deleted successfully".to_string()),
        None,
    )))
}

/// Move an entry to another directory
#[utoipa::path(
    post,
    path = "/api/files/{id}/move",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File ID")
    ),
    request_body = MoveFileDto,
    responses(
        (status = 200, description = "Moved entry", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid destination"),
        (status = 403, description = "Not allowed to modify this entry"),
        (status = 404, description = "File not found"),
        (status = 502, description = "Storage backend failed to move the bytes")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn move_file(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<MoveFileDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.move_file(id, dto, owner.as_deref()).await?;

    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Create a folder
#[utoipa::path(
    post,
    path = "/api/files/folders",
    tag = "files",
    request_body = CreateFolderDto,
    responses(
        (status = 201, description = "Folder created", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Name already taken")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn create_folder(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<CreateFolderDto>,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let folder = service.create_folder(dto, owner.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(folder), None, None)),
    ))
}

/// Upload one or more files
///
/// Accepts multipart/form-data with:
/// - `files`: one part per file (required, repeatable)
/// - `path`: target directory (optional, defaults to "/")
///
/// Files that fail are reported in `errors` without affecting the others.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFilesDto,
        content_type = "multipart/form-data",
        description = "Repeated `files` parts plus an optional target `path`",
    ),
    responses(
        (status = 201, description = "At least one file stored", body = ApiResponse<UploadReportDto>),
        (status = 200, description = "No file could be stored", body = ApiResponse<UploadReportDto>),
        (status = 400, description = "Empty or oversized batch, or invalid path"),
        (status = 413, description = "Request body too large")
    ),
    security(
        (),
        ("owner_id" = [])
    )
)]
pub async fn upload_files(
    owner: OwnerId,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadReportDto>>), AppError> {
    let mut blobs: Vec<UploadBlob> = Vec::new();
    let mut path: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" | "file" => {
                let mime_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                blobs.push(UploadBlob::new(file_name, mime_type, data.to_vec()));
            }
            "path" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read path field: {}", e))
                })?;
                if !text.trim().is_empty() {
                    path = Some(text);
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let report = service
        .upload_files(blobs, path.as_deref(), owner.as_deref())
        .await?;

    let status = if report.files.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let message = format!(
        "{} file(s) uploaded, {} failed",
        report.files.len(),
        report.errors.len()
    );

    Ok((
        status,
        Json(ApiResponse::success(Some(report), Some(message), None)),
    ))
}
