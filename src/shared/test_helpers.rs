//! Service wiring for tests: in-memory repositories and a throwaway upload root

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::core::config::StorageDefaultsConfig;
use crate::features::files::repositories::memory::InMemoryFileRepository;
use crate::features::files::FileService;
use crate::features::storage_settings::repositories::memory::InMemoryStorageConfigRepository;
use crate::features::storage_settings::StorageSettingsService;

pub struct TestContext {
    /// Kept alive so the upload root outlives the services
    pub temp: TempDir,
    pub files_repo: Arc<InMemoryFileRepository>,
    pub settings: Arc<StorageSettingsService>,
    pub files: Arc<FileService>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_defaults(|_| {})
    }

    /// Build a context whose default local storage config is tweaked by `configure`
    pub fn with_defaults(configure: impl FnOnce(&mut StorageDefaultsConfig)) -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");

        let mut defaults = StorageDefaultsConfig {
            base_path: temp.path().join("uploads").display().to_string(),
            ..StorageDefaultsConfig::default()
        };
        configure(&mut defaults);

        let settings_repo = Arc::new(InMemoryStorageConfigRepository::new());
        let settings = Arc::new(StorageSettingsService::new(settings_repo, defaults));

        let files_repo = Arc::new(InMemoryFileRepository::new());
        let files = Arc::new(FileService::new(files_repo.clone(), settings.clone()));

        Self {
            temp,
            files_repo,
            settings,
            files,
        }
    }

    /// Root directory of the default local provider
    pub fn root(&self) -> PathBuf {
        self.temp.path().join("uploads")
    }
}
