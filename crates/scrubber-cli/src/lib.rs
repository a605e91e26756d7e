//! Helpers shared by the `scrubber` binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use scrubber_core::constants::{
    CONTENT_TYPE_JPEG, CONTENT_TYPE_PNG, DEFAULT_CONTENT_TYPE, MAX_BATCH_FILES,
};
use scrubber_core::{AppError, ErrorMetadata, LogLevel, MediaFile, UploadData};
use scrubber_processing::Uploader;
use scrubber_storage::scoped_key;
use serde::Serialize;

/// Content type implied by a file name's extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg" | "jpe" | "jfif") => CONTENT_TYPE_JPEG,
        Some("png") => CONTENT_TYPE_PNG,
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Read a local file into a [`MediaFile`], refusing anything over `max_size` bytes.
pub async fn read_media_file(
    path: &Path,
    content_type: Option<&str>,
    max_size: usize,
) -> Result<MediaFile, AppError> {
    let meta = tokio::fs::metadata(path).await?;
    let size = usize::try_from(meta.len()).unwrap_or(usize::MAX);
    if size > max_size {
        return Err(AppError::PayloadTooLarge {
            size,
            max: max_size,
        });
    }

    let data = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid file name: {}", path.display())))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path));

    let mut file = MediaFile::new(name, content_type, data);
    if let Ok(modified) = meta.modified() {
        file = file.with_last_modified(DateTime::<Utc>::from(modified));
    }
    Ok(file)
}

/// Settings shared by every file of an `upload` batch.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Explicit original key; only valid for a single file.
    pub key: Option<String>,
    pub key_prefix: String,
    pub user_id: Option<String>,
    pub content_type: Option<String>,
    pub max_file_size: usize,
}

/// Outcome of one file in a batch.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadReport {
    fn new(path: &Path, result: Result<UploadData, AppError>) -> Self {
        let file = path.display().to_string();
        match result {
            Ok(upload) => Self {
                file,
                upload: Some(upload),
                error: None,
            },
            Err(err) => {
                log_app_error(&err, "Upload failed");
                Self {
                    file,
                    upload: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Upload up to [`MAX_BATCH_FILES`] files concurrently.
///
/// Each file is read, processed and stored on its own; a failure only affects
/// that file's report. Reports come back in the order of `files`.
pub async fn upload_files(
    uploader: &Uploader,
    files: Vec<PathBuf>,
    request: UploadRequest,
) -> Result<Vec<UploadReport>, AppError> {
    if files.is_empty() {
        return Err(AppError::InvalidInput("No files to upload".to_string()));
    }
    if files.len() > MAX_BATCH_FILES {
        return Err(AppError::InvalidInput(format!(
            "At most {} files can be uploaded at once, got {}",
            MAX_BATCH_FILES,
            files.len()
        )));
    }
    if request.key.is_some() && files.len() > 1 {
        return Err(AppError::InvalidInput(
            "--key can only be used with a single file".to_string(),
        ));
    }

    let request = Arc::new(request);
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let uploader = uploader.clone();
            let request = Arc::clone(&request);
            let task_path = path.clone();
            let handle =
                tokio::spawn(async move { upload_file(&uploader, &task_path, &request).await });
            (path, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(AppError::Internal(format!("Upload task failed: {}", e))),
        };
        reports.push(UploadReport::new(&path, result));
    }
    Ok(reports)
}

async fn upload_file(
    uploader: &Uploader,
    path: &Path,
    request: &UploadRequest,
) -> Result<UploadData, AppError> {
    let media =
        read_media_file(path, request.content_type.as_deref(), request.max_file_size).await?;
    let original_key = match &request.key {
        Some(key) => key.clone(),
        None => scoped_key(
            &request.key_prefix,
            request.user_id.as_deref().unwrap_or_default(),
            &media.name,
        ),
    };
    Ok(uploader.upload(media, &original_key).await?)
}

/// Log an error at the level its metadata asks for.
pub fn log_app_error(err: &AppError, message: &str) {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(code, error = %err, "{}", message),
        LogLevel::Warn => tracing::warn!(code, error = %err, "{}", message),
        LogLevel::Error => tracing::error!(code, error = %err, "{}", message),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
