mod storage_settings_service;

pub use storage_settings_service::StorageSettingsService;
