use scrubber_core::AppError;
use scrubber_storage::StorageError;

use crate::keygen::KeyError;

/// Failures that abort processing of a single file.
///
/// Metadata stripping never appears here: it falls back to the original
/// bytes instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Processing failed: {0}")]
    KeyDerivation(#[from] KeyError),

    #[error("Storage upload failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::KeyDerivation(e) => AppError::Processing(e.to_string()),
            ProcessingError::Storage(e) => e.into(),
        }
    }
}
