//! Scrubber Core Library
//!
//! Domain models, error types, configuration and the identity collaborator
//! shared by the storage, processing and CLI crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use identity::{AnonymousIdentity, IdentityProvider, StaticIdentity};
pub use models::{MediaFile, ProcessedRecord, UploadData};
pub use storage_types::StorageBackend;
