//! Metadata stripping for uploaded images.
//!
//! JPEG APP1 segments (EXIF, XMP) and every PNG chunk outside
//! `IHDR`/`PLTE`/`IDAT`/`IEND` are removed by walking the container
//! structure; pixel data is copied verbatim and never re-encoded.
//!
//! Stripping is best-effort: a malformed file is returned unchanged so an
//! upload is never blocked by its metadata.

use std::fmt::{Display, Formatter, Result as FmtResult};

pub mod jpeg;
pub mod png;
pub mod reader;

pub use reader::ByteReader;

/// Structural problem found while walking a recognized container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("read of {needed} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("invalid length {length} for segment at offset {offset}")]
    InvalidSegmentLength { offset: usize, length: usize },

    #[error("missing {0} signature")]
    BadSignature(ContainerFormat),
}

/// Container formats the stripper understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Jpeg,
    Png,
}

impl ContainerFormat {
    /// Identify the container from its magic bytes; the declared content type is not consulted.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if jpeg::is_jpeg(data) {
            Some(ContainerFormat::Jpeg)
        } else if png::is_png(data) {
            Some(ContainerFormat::Png)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ContainerFormat::Jpeg => scrubber_core::constants::CONTENT_TYPE_JPEG,
            ContainerFormat::Png => scrubber_core::constants::CONTENT_TYPE_PNG,
        }
    }

    fn strip(&self, data: &[u8]) -> Result<Vec<u8>, ParseError> {
        match self {
            ContainerFormat::Jpeg => jpeg::strip(data),
            ContainerFormat::Png => png::strip(data),
        }
    }
}

impl Display for ContainerFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContainerFormat::Jpeg => write!(f, "JPEG"),
            ContainerFormat::Png => write!(f, "PNG"),
        }
    }
}

/// Why [`sanitize`] left the input alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnchangedReason {
    /// Neither JPEG nor PNG magic bytes.
    Unsupported,
    /// Recognized container whose structure could not be walked.
    Malformed {
        format: ContainerFormat,
        error: ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripOutcome {
    Sanitized {
        format: ContainerFormat,
        data: Vec<u8>,
    },
    Unchanged(UnchangedReason),
}

impl StripOutcome {
    /// Collapse to a buffer, falling back to a copy of `original`.
    pub fn into_bytes(self, original: &[u8]) -> Vec<u8> {
        match self {
            StripOutcome::Sanitized { data, .. } => data,
            StripOutcome::Unchanged(_) => original.to_vec(),
        }
    }
}

/// Strip metadata and report what happened.
pub fn sanitize(data: &[u8]) -> StripOutcome {
    let Some(format) = ContainerFormat::detect(data) else {
        return StripOutcome::Unchanged(UnchangedReason::Unsupported);
    };

    match format.strip(data) {
        Ok(stripped) => StripOutcome::Sanitized {
            format,
            data: stripped,
        },
        Err(error) => StripOutcome::Unchanged(UnchangedReason::Malformed { format, error }),
    }
}

/// Remove non-essential metadata from an image buffer.
///
/// Never fails: unsupported formats and files that cannot be parsed come back
/// byte-identical. `content_type` is only used for logging.
pub fn strip(data: &[u8], content_type: &str) -> Vec<u8> {
    let outcome = sanitize(data);

    match &outcome {
        StripOutcome::Sanitized { format, data: out } => {
            if format.content_type() != content_type {
                tracing::debug!(
                    declared = %content_type,
                    detected = %format,
                    "Declared content type does not match detected format"
                );
            }
            tracing::debug!(
                format = %format,
                original_bytes = data.len(),
                sanitized_bytes = out.len(),
                removed_bytes = data.len() - out.len(),
                "Removed image metadata"
            );
        }
        StripOutcome::Unchanged(UnchangedReason::Unsupported) => {
            tracing::debug!(
                content_type = %content_type,
                size_bytes = data.len(),
                "Unrecognized format, leaving file unchanged"
            );
        }
        StripOutcome::Unchanged(UnchangedReason::Malformed { format, error }) => {
            tracing::warn!(
                format = %format,
                content_type = %content_type,
                error = %error,
                "Failed to parse image, keeping original bytes"
            );
        }
    }

    outcome.into_bytes(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn test_detect_ignores_declared_type() {
        assert_eq!(
            ContainerFormat::detect(&[0xFF, 0xD8, 0xFF, 0xD9]),
            Some(ContainerFormat::Jpeg)
        );
        assert_eq!(
            ContainerFormat::detect(&png::SIGNATURE),
            Some(ContainerFormat::Png)
        );
        assert_eq!(ContainerFormat::detect(b"GIF89a"), None);
        assert_eq!(ContainerFormat::detect(&[]), None);
    }

    #[test]
    fn test_unsupported_is_byte_identical() {
        let inputs: [&[u8]; 4] = [b"hello, world", b"", b"\xFF", b"GIF89a\x01\x00"];
        for input in inputs {
            assert_eq!(strip(input, "image/jpeg"), input.to_vec());
            assert_eq!(
                sanitize(input),
                StripOutcome::Unchanged(UnchangedReason::Unsupported)
            );
        }
    }

    #[test]
    fn test_malformed_returns_original() {
        let corrupt = [0xFF, 0xD8, 0xFF, 0xE1, 0xFF, 0xFF, 0x00];
        assert_eq!(strip(&corrupt, "image/jpeg"), corrupt.to_vec());
        assert!(matches!(
            sanitize(&corrupt),
            StripOutcome::Unchanged(UnchangedReason::Malformed {
                format: ContainerFormat::Jpeg,
                ..
            })
        ));
    }

    #[test]
    fn test_png_bytes_declared_as_jpeg_are_still_stripped() {
        let mut input = png::SIGNATURE.to_vec();
        input.extend_from_slice(&[0, 0, 0, 1]);
        input.extend_from_slice(b"tEXt");
        input.extend_from_slice(&[b'x', 0, 0, 0, 0]);

        let out = strip(&input, "image/jpeg");
        assert_eq!(out, png::SIGNATURE.to_vec());
    }

    /// Bytes skewed toward marker and length values so the walkers get past the first segment.
    fn marker_heavy_bytes() -> impl Strategy<Value = Vec<u8>> {
        vec(
            prop_oneof![
                3 => Just(0xFFu8),
                1 => Just(0xE1u8),
                2 => Just(0x00u8),
                5 => any::<u8>(),
            ],
            0..512,
        )
    }

    proptest! {
        #[test]
        fn test_jpeg_signature_output_never_grows(body in marker_heavy_bytes()) {
            let mut input = vec![0xFF, 0xD8];
            input.extend_from_slice(&body);

            let out = strip(&input, "image/jpeg");
            prop_assert!(out.len() <= input.len());
            if jpeg::strip(&input).is_err() {
                prop_assert_eq!(&out, &input);
            }
        }

        #[test]
        fn test_png_signature_output_never_grows(body in marker_heavy_bytes()) {
            let mut input = png::SIGNATURE.to_vec();
            input.extend_from_slice(&body);

            let out = strip(&input, "image/png");
            prop_assert!(out.len() <= input.len());
            if png::strip(&input).is_err() {
                prop_assert_eq!(&out, &input);
            }
        }

        #[test]
        fn test_unrecognized_bytes_are_byte_identical(data in vec(any::<u8>(), 0..512)) {
            prop_assume!(ContainerFormat::detect(&data).is_none());
            prop_assert_eq!(strip(&data, "image/jpeg"), data.clone());
            prop_assert_eq!(strip(&data, "image/png"), data);
        }
    }
}
