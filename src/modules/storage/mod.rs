//! Storage module for file bytes
//!
//! Provides the storage provider contract and its backends (local disk,
//! S3-compatible object storage, cloud drive) plus the factory that builds
//! a provider from a persisted storage configuration.

mod cloud_drive;
mod factory;
mod local;
mod object_storage;
mod provider;

pub use factory::{create_provider, validate_config};
pub use local::LocalStorageConfig;
pub use provider::{generate_safe_name, ProviderKind, StorageProvider, UploadBlob};
