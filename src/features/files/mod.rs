//! File catalog.
//!
//! Metadata rows for files and folders, with the bytes kept by whichever
//! storage provider is active. Folders exist only in the catalog.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/files` | List a directory |
//! | GET | `/api/files/search` | Search by name |
//! | POST | `/api/files/upload` | Batch upload (multipart) |
//! | POST | `/api/files/folders` | Create a folder |
//! | GET/PATCH/DELETE | `/api/files/{id}` | Read, update, delete |
//! | GET | `/api/files/{id}/url` | Access URL |
//! | POST | `/api/files/{id}/move` | Move to another directory |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgFileRepository;
pub use routes::routes;
pub use services::FileService;
