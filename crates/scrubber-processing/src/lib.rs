//! Scrubber Processing Library
//!
//! Metadata stripping for JPEG/PNG uploads, time-ordered storage key
//! derivation and the upload pipeline that ties them to an object store.

pub mod error;
pub mod keygen;
pub mod strip;
pub mod upload;

// Re-export commonly used types
pub use error::ProcessingError;
pub use keygen::{
    derive_key, derive_storage_key, Clock, EntropySource, FixedClock, FixedEntropy, KeyDeriver,
    KeyError, OsEntropy, SystemClock,
};
pub use strip::{sanitize, strip, ContainerFormat, ParseError, StripOutcome, UnchangedReason};
pub use upload::{process, Uploader};
