//! Shared constants.

/// Metadata key under which the uploader's user id is stored with each object.
pub const USER_ID_METADATA_KEY: &str = "userId";

pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";
pub const CONTENT_TYPE_PNG: &str = "image/png";

/// Declared content types the upload pipeline sends through the metadata stripper.
pub const STRIPPABLE_CONTENT_TYPES: [&str; 2] = [CONTENT_TYPE_JPEG, CONTENT_TYPE_PNG];

/// Default first segment of caller-scoped storage keys (`media/{identity}/...`).
pub const DEFAULT_KEY_PREFIX: &str = "media";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Most files a single upload request may carry.
pub const MAX_BATCH_FILES: usize = 10;
