pub mod files;
pub mod storage_settings;
