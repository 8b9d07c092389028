mod storage_config_repository;

#[cfg(test)]
pub mod memory;

pub use storage_config_repository::{PgStorageConfigRepository, StorageConfigRepository};
