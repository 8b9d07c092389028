use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{
    CreateFolderDto, FileDetailDto, FileListDto, FileResponseDto, ListFilesQuery, MoveFileDto,
    SearchFilesQuery, UpdateFileDto, UploadErrorDto, UploadReportDto,
};
use crate::features::files::models::{
    FileChanges, FileFilter, FileLocation, FileRecord, FileType, NewFileRecord,
};
use crate::features::files::repositories::FileRepository;
use crate::features::storage_settings::StorageSettingsService;
use crate::modules::storage::{generate_safe_name, StorageProvider, UploadBlob};
use crate::shared::constants::MAX_PAGE_SIZE;
use crate::shared::path::{is_within, join_storage, normalize_virtual_path, sanitize_path};
use crate::shared::types::PaginationQuery;

/// File catalog: metadata rows in the database, bytes in the active provider
pub struct FileService {
    repository: Arc<dyn FileRepository>,
    settings: Arc<StorageSettingsService>,
}

impl FileService {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        settings: Arc<StorageSettingsService>,
    ) -> Self {
        Self {
            repository,
            settings,
        }
    }

    async fn find_active(&self, id: Uuid) -> Result<FileRecord> {
        self.repository
            .find_active_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File '{}' not found", id)))
    }

    /// Unowned entries are open; owned ones need the owner or a write/admin grant
    async fn ensure_can_modify(&self, record: &FileRecord, owner_id: Option<&str>) -> Result<()> {
        let Some(owner_id) = owner_id else {
            return Ok(());
        };

        match record.owner_id.as_deref() {
            None => return Ok(()),
            Some(owner) if owner == owner_id => return Ok(()),
            Some(_) => {}
        }

        let permissions = self.repository.permissions_for(record.id, owner_id).await?;
        if permissions.iter().any(|p| p.allows_write()) {
            return Ok(());
        }

        Err(AppError::Forbidden(
            "You do not have permission to modify this file".to_string(),
        ))
    }

    /// Provider that holds the bytes of `record`, when it is the active one
    async fn provider_for(&self, record: &FileRecord) -> Result<Arc<dyn StorageProvider>> {
        let (config, provider) = self.settings.active_provider().await?;
        if config.provider != record.provider {
            return Err(AppError::Conflict(format!(
                "File '{}' is stored in '{}' but the active provider is '{}'",
                record.name, record.provider, config.provider
            )));
        }
        Ok(provider)
    }

    /// Remove stored bytes; failures are logged and swallowed
    async fn delete_bytes(&self, records: &[FileRecord]) {
        let targets: Vec<&FileRecord> = records
            .iter()
            .filter(|r| !r.is_folder() && r.storage_path.is_some())
            .collect();
        let Some(&first) = targets.first() else {
            return;
        };

        let provider = match self.provider_for(first).await {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Skipping physical delete of {} files: {}", targets.len(), e);
                return;
            }
        };

        for record in targets {
            if record.provider != first.provider {
                warn!(
                    "Skipping physical delete of {}: stored in '{}'",
                    record.id, record.provider
                );
                continue;
            }
            if let Some(storage_path) = &record.storage_path {
                if !provider.delete(storage_path).await {
                    warn!(
                        "Failed to delete stored bytes for file {} at {}",
                        record.id, storage_path
                    );
                }
            }
        }
    }

    /// List one directory, folders first then newest first
    pub async fn list_files(
        &self,
        query: ListFilesQuery,
        owner_id: Option<&str>,
    ) -> Result<FileListDto> {
        let path = normalize_virtual_path(query.path.as_deref().unwrap_or("/"))?;
        let pagination = PaginationQuery::new(query.page, query.limit);

        let filter = FileFilter {
            path: Some(path),
            owner_id: owner_id.map(str::to_string),
            file_type: query.file_type,
        };

        let (records, total) = self
            .repository
            .list(&filter, pagination.limit(), pagination.offset())
            .await?;

        Ok(FileListDto {
            files: records.into_iter().map(|r| r.into()).collect(),
            total,
            page: pagination.page(),
            limit: pagination.limit(),
            has_more: pagination.has_more(total),
        })
    }

    /// Fetch one entry; with an owner id, that user's permission rows are attached
    pub async fn get_file_by_id(&self, id: Uuid, owner_id: Option<&str>) -> Result<FileDetailDto> {
        let record = self.find_active(id).await?;

        let permissions = match owner_id {
            Some(owner_id) => Some(
                self.repository
                    .permissions_for(record.id, owner_id)
                    .await?
                    .into_iter()
                    .map(|p| p.into())
                    .collect(),
            ),
            None => None,
        };

        Ok(FileDetailDto {
            file: record.into(),
            permissions,
        })
    }

    /// Store a batch of blobs in the active provider and catalog them.
    ///
    /// Batch-level problems fail the whole call before any write. After that
    /// each blob succeeds or fails on its own.
    pub async fn upload_files(
        &self,
        blobs: Vec<UploadBlob>,
        path: Option<&str>,
        owner_id: Option<&str>,
    ) -> Result<UploadReportDto> {
        if blobs.is_empty() {
            return Err(AppError::Validation("No files provided".to_string()));
        }

        let virtual_path = normalize_virtual_path(path.unwrap_or("/"))?;
        let (config, provider) = self.settings.active_provider().await?;

        let max_files = provider.limits().max_files_per_upload;
        if blobs.len() > max_files {
            return Err(AppError::Validation(format!(
                "Too many files ({}). Maximum per upload is {}",
                blobs.len(),
                max_files
            )));
        }

        let storage_dir = sanitize_path(&virtual_path);
        let mut report = UploadReportDto::default();

        for blob in &blobs {
            match self
                .store_blob(
                    provider.as_ref(),
                    &config.provider,
                    blob,
                    &virtual_path,
                    &storage_dir,
                    owner_id,
                )
                .await
            {
                Ok(record) => report.files.push(record.into()),
                Err(e) => {
                    warn!("Upload of '{}' failed: {}", blob.name, e);
                    report.errors.push(UploadErrorDto {
                        filename: blob.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Upload batch finished: stored={}, failed={}, path={}, provider={}",
            report.files.len(),
            report.errors.len(),
            virtual_path,
            config.provider
        );

        Ok(report)
    }

    async fn store_blob(
        &self,
        provider: &dyn StorageProvider,
        provider_name: &str,
        blob: &UploadBlob,
        virtual_path: &str,
        storage_dir: &str,
        owner_id: Option<&str>,
    ) -> Result<FileRecord> {
        let safe_name = generate_safe_name(&blob.name);
        let dest = join_storage(storage_dir, &safe_name);
        let stored = provider.upload(blob, &dest).await?;

        let mut metadata = stored.metadata;
        metadata.insert("originalName".to_string(), Value::String(blob.name.clone()));

        let new = NewFileRecord {
            name: safe_name,
            path: virtual_path.to_string(),
            file_type: FileType::File,
            provider: provider_name.to_string(),
            storage_path: Some(stored.path.clone()),
            size: stored.size as i64,
            mime_type: Some(blob.mime_type.clone()),
            url: Some(stored.url),
            owner_id: owner_id.map(str::to_string),
            metadata,
        };

        let inserted = match new.validate() {
            Ok(()) => self.repository.insert(new).await,
            Err(e) => Err(AppError::Validation(format!("Invalid file record: {}", e))),
        };

        match inserted {
            Ok(record) => {
                debug!(
                    "File stored: id={}, storage_path={}, size={}",
                    record.id, stored.path, record.size
                );
                Ok(record)
            }
            Err(e) => {
                // bytes without a row are unreachable, drop them
                if !provider.delete(&stored.path).await {
                    warn!("Failed to remove orphaned upload at {}", stored.path);
                }
                Err(e)
            }
        }
    }

    /// Soft-delete an entry (and a folder's whole subtree); returns the number of entries deleted
    pub async fn delete_file(&self, id: Uuid, owner_id: Option<&str>) -> Result<u64> {
        let record = self.find_active(id).await?;
        self.ensure_can_modify(&record, owner_id).await?;

        let deleted = if record.is_folder() {
            let descendants = self.repository.find_descendants(&record.full_path()).await?;
            let ids: Vec<Uuid> = descendants.iter().map(|d| d.id).collect();

            let mut deleted = self.repository.soft_delete(&ids).await?;
            self.delete_bytes(&descendants).await;
            deleted += self.repository.soft_delete(&[record.id]).await?;
            deleted
        } else {
            let deleted = self.repository.soft_delete(&[record.id]).await?;
            self.delete_bytes(std::slice::from_ref(&record)).await;
            deleted
        };

        info!(
            "File deleted: id={}, type={}, entries={}",
            record.id, record.file_type, deleted
        );

        Ok(deleted)
    }

    /// Rename an entry and/or replace its metadata
    pub async fn update_file(
        &self,
        id: Uuid,
        dto: UpdateFileDto,
        owner_id: Option<&str>,
    ) -> Result<FileResponseDto> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

        let changes = FileChanges {
            name: dto.name.map(|n| n.trim().to_string()),
            metadata: dto.metadata,
        };
        if changes.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }
        if changes.metadata.as_ref().is_some_and(|m| !m.is_object()) {
            return Err(AppError::Validation(
                "metadata must be a JSON object".to_string(),
            ));
        }

        let record = self.find_active(id).await?;
        self.ensure_can_modify(&record, owner_id).await?;

        let renamed = changes.name.clone().filter(|n| *n != record.name);
        if let Some(name) = &renamed {
            self.ensure_location_free(&record.path, name).await?;
        }

        let updated = match (record.is_folder(), renamed.as_deref()) {
            // a folder rename rewrites the paths of everything below it
            (true, Some(name)) => {
                let mut updated = self
                    .repository
                    .relocate_folder(id, &record.path, Some(name))
                    .await?;
                if let Some(metadata) = changes.metadata {
                    updated = self
                        .repository
                        .update(
                            id,
                            FileChanges {
                                name: None,
                                metadata: Some(metadata),
                            },
                        )
                        .await?;
                }
                updated
            }
            _ => self.repository.update(id, changes).await?,
        };

        let updated =
            updated.ok_or_else(|| AppError::NotFound(format!("File '{}' not found", id)))?;

        info!("File updated: id={}, name={}", updated.id, updated.name);
        Ok(updated.into())
    }

    async fn ensure_location_free(&self, path: &str, name: &str) -> Result<()> {
        if self
            .repository
            .find_active_by_location(path, name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "An entry named '{}' already exists in '{}'",
                name, path
            )));
        }
        Ok(())
    }

    /// Create an empty folder record; never touches the provider
    pub async fn create_folder(
        &self,
        dto: CreateFolderDto,
        owner_id: Option<&str>,
    ) -> Result<FileResponseDto> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

        let name = dto.name.trim().to_string();
        let path = normalize_virtual_path(dto.path.as_deref().unwrap_or("/"))?;
        self.ensure_location_free(&path, &name).await?;

        let config = self.settings.ensure_default().await?;
        let new = NewFileRecord::folder(name, path, config.provider, owner_id.map(str::to_string));
        new.validate()
            .map_err(|e| AppError::Validation(format!("Invalid folder: {}", e)))?;

        let folder = self.repository.insert(new).await?;
        info!(
            "Folder created: id={}, path={}",
            folder.id,
            folder.full_path()
        );

        Ok(folder.into())
    }

    /// Move an entry to another directory
    pub async fn move_file(
        &self,
        id: Uuid,
        dto: MoveFileDto,
        owner_id: Option<&str>,
    ) -> Result<FileResponseDto> {
        dto.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
        let new_path = normalize_virtual_path(&dto.new_path)?;

        let record = self.find_active(id).await?;
        self.ensure_can_modify(&record, owner_id).await?;

        if new_path == record.path {
            return Ok(record.into());
        }

        if record.is_folder() {
            if is_within(&new_path, &record.full_path()) {
                return Err(AppError::Validation(format!(
                    "Cannot move folder '{}' into itself",
                    record.full_path()
                )));
            }
            self.ensure_location_free(&new_path, &record.name).await?;

            let moved = self
                .repository
                .relocate_folder(id, &new_path, None)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("File '{}' not found", id)))?;

            info!(
                "Folder moved: id={}, from={}, to={}",
                id, record.path, new_path
            );
            return Ok(moved.into());
        }

        self.ensure_location_free(&new_path, &record.name).await?;

        let source = record.storage_path.clone().ok_or_else(|| {
            AppError::Internal(format!("File '{}' has no storage path", record.id))
        })?;
        let provider = self.provider_for(&record).await?;
        let dest = join_storage(&sanitize_path(&new_path), &record.name);

        if !provider.move_file(&source, &dest).await {
            return Err(AppError::StorageIo(format!(
                "Failed to move '{}' to '{}'",
                source, dest
            )));
        }

        let location = FileLocation {
            path: new_path,
            url: Some(provider.get_url(&dest)),
            storage_path: Some(dest),
        };
        let moved = self
            .repository
            .update_location(id, location)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File '{}' not found", id)))?;

        info!(
            "File moved: id={}, from={}, to={}",
            id,
            source,
            moved.storage_path.as_deref().unwrap_or_default()
        );

        Ok(moved.into())
    }

    /// Case-insensitive name search
    pub async fn search_files(
        &self,
        query: SearchFilesQuery,
        owner_id: Option<&str>,
    ) -> Result<Vec<FileResponseDto>> {
        let needle = query.q.trim();
        if needle.is_empty() {
            return Err(AppError::Validation("Search query is required".to_string()));
        }

        let path = query
            .path
            .as_deref()
            .map(normalize_virtual_path)
            .transpose()?;

        let filter = FileFilter {
            path,
            owner_id: owner_id.map(str::to_string),
            file_type: query.file_type,
        };
        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

        let records = self.repository.search(needle, &filter, limit).await?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Stored access URL of a file
    pub async fn get_file_url(&self, id: Uuid) -> Result<String> {
        let record = self.find_active(id).await?;
        if record.is_folder() {
            return Err(AppError::Validation(format!(
                "'{}' is a folder and has no URL",
                record.name
            )));
        }

        record
            .url
            .ok_or_else(|| AppError::NotFound(format!("File '{}' has no URL", id)))
    }
}
