//! In-memory file repository for tests

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::files::models::{
    FileChanges, FileFilter, FileLocation, FilePermission, FileRecord, NewFileRecord,
};
use crate::features::files::repositories::FileRepository;
use crate::shared::path::{is_within, join_virtual};

#[derive(Default)]
pub struct InMemoryFileRepository {
    rows: Mutex<Vec<FileRecord>>,
    permissions: Mutex<Vec<FilePermission>>,
    /// Makes the next `insert` fail, for cleanup paths
    fail_next_insert: Mutex<bool>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, file_id: Uuid, user_id: &str, permission: &str) {
        self.permissions.lock().unwrap().push(FilePermission {
            id: Uuid::new_v4(),
            file_id,
            user_id: user_id.to_string(),
            permission: permission.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn fail_next_insert(&self) {
        *self.fail_next_insert.lock().unwrap() = true;
    }

    /// Every row, deleted ones included
    pub fn all_rows(&self) -> Vec<FileRecord> {
        self.rows.lock().unwrap().clone()
    }

    fn matches(record: &FileRecord, filter: &FileFilter) -> bool {
        !record.is_deleted
            && filter.path.as_ref().is_none_or(|p| &record.path == p)
            && filter
                .owner_id
                .as_ref()
                .is_none_or(|o| record.owner_id.as_ref() == Some(o))
            && filter
                .file_type
                .is_none_or(|t| record.file_type == t.as_str())
    }

    fn sort(records: &mut [FileRecord]) {
        records.sort_by(|a, b| {
            b.is_folder()
                .cmp(&a.is_folder())
                .then(b.created_at.cmp(&a.created_at))
        });
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn insert(&self, new: NewFileRecord) -> Result<FileRecord> {
        {
            let mut fail = self.fail_next_insert.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(sqlx::Error::PoolTimedOut.into());
            }
        }

        let mut rows = self.rows.lock().unwrap();
        // keep created_at strictly increasing so ordering is deterministic
        let now = rows
            .iter()
            .map(|r| r.created_at + Duration::milliseconds(1))
            .max()
            .map_or_else(Utc::now, |next| next.max(Utc::now()));

        let record = FileRecord {
            id: Uuid::new_v4(),
            name: new.name,
            path: new.path,
            file_type: new.file_type.as_str().to_string(),
            provider: new.provider,
            storage_path: new.storage_path,
            size: new.size,
            mime_type: new.mime_type,
            url: new.url,
            owner_id: new.owner_id,
            metadata: Value::Object(new.metadata),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.id == id && !r.is_deleted).cloned())
    }

    async fn find_active_by_location(
        &self,
        path: &str,
        name: &str,
    ) -> Result<Option<FileRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| !r.is_deleted && r.path == path && r.name == name)
            .cloned())
    }

    async fn list(
        &self,
        filter: &FileFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileRecord>, i64)> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<FileRecord> = rows
            .iter()
            .filter(|r| Self::matches(r, filter))
            .cloned()
            .collect();
        Self::sort(&mut matching);

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn search(
        &self,
        query: &str,
        filter: &FileFilter,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let needle = query.to_lowercase();
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<FileRecord> = rows
            .iter()
            .filter(|r| Self::matches(r, filter) && r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Self::sort(&mut matching);
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn find_descendants(&self, full_path: &str) -> Result<Vec<FileRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| !r.is_deleted && is_within(&r.path, full_path))
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, ids: &[Uuid]) -> Result<u64> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for row in rows.iter_mut() {
            if ids.contains(&row.id) && !row.is_deleted {
                row.is_deleted = true;
                row.deleted_at = Some(now);
                row.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn update(&self, id: Uuid, changes: FileChanges) -> Result<Option<FileRecord>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id && !r.is_deleted) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(metadata) = changes.metadata {
            row.metadata = metadata;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn update_location(
        &self,
        id: Uuid,
        location: FileLocation,
    ) -> Result<Option<FileRecord>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id && !r.is_deleted) else {
            return Ok(None);
        };
        row.path = location.path;
        row.storage_path = location.storage_path;
        row.url = location.url;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn relocate_folder(
        &self,
        id: Uuid,
        new_path: &str,
        new_name: Option<&str>,
    ) -> Result<Option<FileRecord>> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();

        let Some(current) = rows.iter().find(|r| r.id == id && !r.is_deleted).cloned() else {
            return Ok(None);
        };
        let old_full = current.full_path();
        let name = new_name.unwrap_or(&current.name).to_string();
        let new_full = join_virtual(new_path, &name);

        for row in rows.iter_mut() {
            if row.is_deleted {
                continue;
            }
            if row.id == id {
                row.path = new_path.to_string();
                row.name = name.clone();
                row.updated_at = now;
            } else if is_within(&row.path, &old_full) {
                row.path = format!("{}{}", new_full, &row.path[old_full.len()..]);
                row.updated_at = now;
            }
        }

        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn permissions_for(&self, file_id: Uuid, user_id: &str) -> Result<Vec<FilePermission>> {
        let permissions = self.permissions.lock().unwrap();
        Ok(permissions
            .iter()
            .filter(|p| p.file_id == file_id && p.user_id == user_id)
            .cloned()
            .collect())
    }
}
