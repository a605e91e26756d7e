//! Upload domain models.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{STRIPPABLE_CONTENT_TYPES, USER_ID_METADATA_KEY};

/// A file travelling through the upload pipeline.
///
/// Raw uploads and sanitized output share this shape; sanitizing produces a
/// new `MediaFile` via [`MediaFile::with_data`] and never touches the
/// original buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            last_modified: None,
            data: data.into(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Same name, content type and timestamp, different bytes.
    pub fn with_data(&self, data: impl Into<Bytes>) -> Self {
        Self {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            last_modified: self.last_modified,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the declared content type is one the metadata stripper handles.
    ///
    /// The comparison is exact: `image/JPEG` or `image/jpeg; q=1` bypass stripping.
    pub fn is_strippable(&self) -> bool {
        STRIPPABLE_CONTENT_TYPES.contains(&self.content_type.as_str())
    }
}

/// Output of the processing pipeline, ready to hand to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedRecord {
    pub file: MediaFile,
    pub key: String,
    pub metadata: BTreeMap<String, String>,
}

impl ProcessedRecord {
    pub fn new(file: MediaFile, key: String, user_id: Option<&str>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            USER_ID_METADATA_KEY.to_string(),
            user_id.unwrap_or_default().to_string(),
        );
        Self {
            file,
            key,
            metadata,
        }
    }

    pub fn user_id(&self) -> &str {
        self.metadata
            .get(USER_ID_METADATA_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Summary of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadData {
    pub original_key: String,
    pub storage_key: String,
    pub location: String,
    pub content_type: String,
    pub user_id: String,
    pub original_size: usize,
    pub stored_size: usize,
}

impl UploadData {
    /// Bytes of metadata removed by sanitization.
    pub fn bytes_removed(&self) -> usize {
        self.original_size.saturating_sub(self.stored_size)
    }
}
