mod storage_config;

pub use storage_config::{NewStorageConfig, StorageConfig, StorageConfigChanges};
