//! Hands processed files to the object store.

use std::sync::Arc;

use scrubber_core::{Config, IdentityProvider, MediaFile, UploadData};
use scrubber_storage::Storage;

use super::pipeline::{process_with_options, ProcessOptions};
use crate::error::ProcessingError;
use crate::keygen::KeyDeriver;

/// Runs the processing pipeline for the current identity and stores the result.
#[derive(Clone)]
pub struct Uploader {
    storage: Arc<dyn Storage>,
    identity: Arc<dyn IdentityProvider>,
    keys: KeyDeriver,
    options: ProcessOptions,
}

impl Uploader {
    pub fn new(
        storage: Arc<dyn Storage>,
        identity: Arc<dyn IdentityProvider>,
        keys: KeyDeriver,
    ) -> Self {
        Self {
            storage,
            identity,
            keys,
            options: ProcessOptions::default(),
        }
    }

    /// System key sources; stripping follows `REMOVE_EXIF`.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self::new(storage, identity, KeyDeriver::system()).with_strip_metadata(config.remove_exif)
    }

    pub fn with_strip_metadata(mut self, strip_metadata: bool) -> Self {
        self.options.strip_metadata = strip_metadata;
        self
    }

    /// Process `file` and write it under a key derived from `original_key`.
    ///
    /// A failed store write is returned as-is and not retried here.
    #[tracing::instrument(skip(self, file), fields(
        file_name = %file.name,
        content_type = %file.content_type,
        size_bytes = file.len()
    ))]
    pub async fn upload(
        &self,
        file: MediaFile,
        original_key: &str,
    ) -> Result<UploadData, ProcessingError> {
        let user_id = self.identity.user_id();
        let original_size = file.len();

        let record = process_with_options(
            file,
            original_key,
            user_id.as_deref(),
            &self.keys,
            self.options,
        )
        .await?;

        let location = self
            .storage
            .put(
                &record.key,
                record.file.data.clone(),
                &record.file.content_type,
                &record.metadata,
            )
            .await?;

        let data = UploadData {
            original_key: original_key.to_string(),
            storage_key: record.key.clone(),
            location,
            content_type: record.file.content_type.clone(),
            user_id: record.user_id().to_string(),
            original_size,
            stored_size: record.file.len(),
        };

        tracing::info!(
            storage_key = %data.storage_key,
            backend = %self.storage.backend_type(),
            bytes_removed = data.bytes_removed(),
            "Upload stored"
        );

        Ok(data)
    }
}
