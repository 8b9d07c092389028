//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the storage providers that hold file bytes.

pub mod storage;
