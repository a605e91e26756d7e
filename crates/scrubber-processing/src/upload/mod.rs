//! Upload pipeline: sanitize → derive key → store.

pub mod pipeline;
pub mod uploader;

pub use pipeline::{process, process_with_options, ProcessOptions};
pub use uploader::Uploader;
