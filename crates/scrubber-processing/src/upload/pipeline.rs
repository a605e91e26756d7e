//! Output assembly: sanitized file + derived key + uploader metadata.

use scrubber_core::{MediaFile, ProcessedRecord};

use crate::error::ProcessingError;
use crate::keygen::KeyDeriver;
use crate::strip;

/// Pipeline switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Run the metadata stripper on `image/jpeg` and `image/png` uploads.
    pub strip_metadata: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            strip_metadata: true,
        }
    }
}

/// Prepare a file for storage.
///
/// Strips metadata when the declared type is exactly `image/jpeg` or
/// `image/png`, derives a new key under the same prefix as `original_key` and
/// records `userId` (empty when absent). Only key derivation can fail.
pub async fn process(
    file: MediaFile,
    original_key: &str,
    user_id: Option<&str>,
    keys: &KeyDeriver,
) -> Result<ProcessedRecord, ProcessingError> {
    process_with_options(file, original_key, user_id, keys, ProcessOptions::default()).await
}

pub async fn process_with_options(
    file: MediaFile,
    original_key: &str,
    user_id: Option<&str>,
    keys: &KeyDeriver,
    options: ProcessOptions,
) -> Result<ProcessedRecord, ProcessingError> {
    let file = if options.strip_metadata && file.is_strippable() {
        sanitize_file(file).await
    } else {
        tracing::debug!(
            content_type = %file.content_type,
            strip_metadata = options.strip_metadata,
            "Skipping metadata removal"
        );
        file
    };

    let key = keys.derive_storage_key(original_key).map_err(|e| {
        tracing::error!(error = %e, original_key = %original_key, "Storage key derivation failed");
        ProcessingError::from(e)
    })?;

    Ok(ProcessedRecord::new(file, key, user_id))
}

type Stripper = fn(&[u8], &str) -> Vec<u8>;

async fn sanitize_file(file: MediaFile) -> MediaFile {
    sanitize_file_with(file, strip::strip).await
}

/// Strip on the blocking pool; if that task dies, keep the original file.
async fn sanitize_file_with(file: MediaFile, stripper: Stripper) -> MediaFile {
    let data = file.data.clone();
    let content_type = file.content_type.clone();

    match tokio::task::spawn_blocking(move || stripper(&data, &content_type)).await {
        Ok(stripped) => file.with_data(stripped),
        Err(e) => {
            tracing::warn!(
                error = %e,
                file_name = %file.name,
                "Metadata removal task failed, using original file"
            );
            file
        }
    }
}
