//! Shared key helpers for storage backends.
//!
//! Key format written by the upload pipeline: `{prefix}/{identity}/{filename}`.

use crate::traits::{StorageError, StorageResult};

/// Suffix of the sidecar file the local backend keeps next to each object.
pub(crate) const METADATA_SUFFIX: &str = ".meta.json";

/// Build the caller-scoped key for an identity and filename.
///
/// An empty identity collapses to `{prefix}/{filename}`. Surrounding slashes
/// on the parts are trimmed so the result never has empty segments at the joins.
pub fn scoped_key(prefix: &str, identity: &str, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let identity = identity.trim_matches('/');
    let filename = filename.trim_start_matches('/');
    if identity.is_empty() {
        format!("{}/{}", prefix, filename)
    } else {
        format!("{}/{}/{}", prefix, identity, filename)
    }
}

/// Reject keys that could escape a backend's namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key.ends_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key must name an object, not a directory".to_string(),
        ));
    }
    if key.ends_with(METADATA_SUFFIX) {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must not end with {}",
            METADATA_SUFFIX
        )));
    }
    Ok(())
}
