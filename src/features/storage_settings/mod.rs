//! Storage settings registry.
//!
//! Named provider configurations, of which at most one is active. The active
//! one decides where the file catalog writes new uploads.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/storage-settings` | List configurations |
//! | POST | `/api/storage-settings` | Create a configuration |
//! | GET | `/api/storage-settings/active` | Active configuration |
//! | GET/PUT/DELETE | `/api/storage-settings/{id}` | Read, update, delete |
//! | POST | `/api/storage-settings/{id}/activate` | Make active |
//! | POST | `/api/storage-settings/{id}/test` | Connection test |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgStorageConfigRepository;
pub use routes::routes;
pub use services::StorageSettingsService;
