use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::{validate_key, METADATA_SUFFIX};
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;

/// Sidecar record written next to every stored object.
#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    metadata: BTreeMap<String, String>,
}

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    /// (e.g., "/var/lib/scrubber/uploads"); the directory is created if missing.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Remove a data file left behind by a failed `put`.
    async fn discard(path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially stored object"
            ),
        }
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory, including
    /// through symlinks already present under it.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // The deepest existing ancestor must stay inside the base directory.
        let mut existing = path.as_path();
        while !existing.exists() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        if let Ok(canonical) = existing.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut os = path.as_os_str().to_owned();
        os.push(METADATA_SUFFIX);
        PathBuf::from(os)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &BTreeMap<String, String>,
    ) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let meta = serde_json::to_vec_pretty(&ObjectMeta {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        })?;

        // No data file may outlive a failed put.
        if let Err(e) = Self::write_file(&path, &data).await {
            Self::discard(&path).await;
            return Err(e);
        }
        if let Err(e) = Self::write_file(&Self::meta_path(&path), &meta).await {
            Self::discard(&path).await;
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(format!("file://{}", path.display()))
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        // Objects written by other tools may lack a sidecar.
        let meta = match fs::read(Self::meta_path(&path)).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ObjectMeta {
                content_type: scrubber_core::constants::DEFAULT_CONTENT_TYPE.to_string(),
                metadata: BTreeMap::new(),
            },
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(key = %key, size_bytes = data.len(), "Local storage download successful");

        Ok(StoredObject {
            key: key.to_string(),
            content_type: meta.content_type,
            metadata: meta.metadata,
            data: Bytes::from(data),
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        for target in [path.clone(), Self::meta_path(&path)] {
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        target.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(key = %key, "Local storage delete successful");
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
