//! PNG chunk walk and ancillary-chunk removal.

use std::borrow::Cow;

use super::reader::ByteReader;
use super::{ContainerFormat, ParseError};

pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunks kept by [`strip`]: header, palette, image data and end marker.
///
/// Everything else is dropped, including rendering hints such as `tRNS`,
/// `gAMA` and `iCCP`.
pub const KEPT_CHUNKS: [[u8; 4]; 4] = [*b"IHDR", *b"IDAT", *b"PLTE", *b"IEND"];

/// Length, type, data and CRC fields.
const CHUNK_OVERHEAD: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub offset: usize,
    pub chunk_type: [u8; 4],
    pub data_len: u32,
    /// Raw bytes: length, type, data and CRC.
    pub bytes: &'a [u8],
}

impl Chunk<'_> {
    pub fn type_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.chunk_type)
    }

    pub fn is_kept(&self) -> bool {
        KEPT_CHUNKS.contains(&self.chunk_type)
    }

    /// Ancillary chunks have bit 5 set in the first type byte (lowercase letter).
    pub fn is_ancillary(&self) -> bool {
        self.chunk_type[0] & 0x20 != 0
    }
}

pub fn is_png(data: &[u8]) -> bool {
    let reader = ByteReader::new(data);
    reader.read_u32_be(0) == Ok(0x8950_4E47) && reader.read_u32_be(4) == Ok(0x0D0A_1A0A)
}

/// Split a PNG into its chunks, in file order.
///
/// The walk advances by `12 + length` per chunk until the buffer is
/// exhausted; a header or body that runs past the end is an error.
pub fn chunks(data: &[u8]) -> Result<Vec<Chunk<'_>>, ParseError> {
    if !is_png(data) {
        return Err(ParseError::BadSignature(ContainerFormat::Png));
    }

    let reader = ByteReader::new(data);
    let mut out = Vec::new();
    let mut offset = SIGNATURE.len();

    while offset < reader.len() {
        let data_len = reader.read_u32_be(offset)?;
        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(reader.slice(offset + 4, 4)?);

        let total = usize::try_from(data_len)
            .ok()
            .and_then(|len| len.checked_add(CHUNK_OVERHEAD))
            .ok_or(ParseError::InvalidSegmentLength {
                offset,
                length: data_len as usize,
            })?;
        let bytes = reader.slice(offset, total)?;

        out.push(Chunk {
            offset,
            chunk_type,
            data_len,
            bytes,
        });
        offset += total;
    }

    Ok(out)
}

/// Rebuild the PNG from its signature and the [`KEPT_CHUNKS`], bytes unaltered.
pub fn strip(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    let chunks = chunks(data)?;
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&SIGNATURE);
    for chunk in chunks {
        if chunk.is_kept() {
            out.extend_from_slice(chunk.bytes);
        } else {
            tracing::trace!(
                chunk_type = %chunk.type_str(),
                offset = chunk.offset,
                size_bytes = chunk.bytes.len(),
                "Dropping PNG chunk"
            );
        }
    }
    Ok(out)
}
