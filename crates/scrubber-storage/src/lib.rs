//! Scrubber Storage Library
//!
//! The object-store collaborator of the upload pipeline: the [`Storage`]
//! trait plus local filesystem and in-memory backends.
//!
//! # Storage key format
//!
//! The pipeline writes caller-scoped keys of the form
//! `{prefix}/{identity}/{filename}` (see [`scoped_key`]). Backends accept any
//! relative key but reject keys containing `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{scoped_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use scrubber_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};

impl From<StorageError> for scrubber_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => scrubber_core::AppError::NotFound(key),
            StorageError::InvalidKey(msg) => scrubber_core::AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => scrubber_core::AppError::Config(msg),
            other => scrubber_core::AppError::Storage(other.to_string()),
        }
    }
}
