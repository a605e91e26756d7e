//! Storage abstraction trait
//!
//! This module defines the object-store collaborator the upload pipeline
//! writes to: a key, the file bytes and a small string metadata map.

use std::collections::BTreeMap;

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An object as held by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    pub data: Bytes,
}

/// Storage abstraction trait
///
/// The pipeline only relies on [`Storage::put`]; the remaining operations
/// exist for callers that inspect or clean up what was written.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key` with its content type and metadata, returning
    /// the object's location (URL or path).
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<String>;

    /// Fetch an object with its content type and metadata
    async fn get(&self, key: &str) -> StorageResult<StoredObject>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete an object; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
