//! Bounds-checked big-endian reads over an immutable byte slice.

use super::ParseError;

/// Read-only view over an input buffer.
///
/// Every accessor validates `offset + width` against the buffer length with
/// checked arithmetic and reports [`ParseError::OutOfBounds`] instead of
/// panicking.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, ParseError> {
        self.slice(offset, 1).map(|b| b[0])
    }

    pub fn read_u16_be(&self, offset: usize) -> Result<u16, ParseError> {
        self.array::<2>(offset).map(u16::from_be_bytes)
    }

    pub fn read_u32_be(&self, offset: usize) -> Result<u32, ParseError> {
        self.array::<4>(offset).map(u32::from_be_bytes)
    }

    /// `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], ParseError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(ParseError::OutOfBounds {
                offset,
                needed: len,
                len: self.data.len(),
            })
    }

    /// Everything from `offset` to the end; empty when `offset == len`.
    pub fn rest(&self, offset: usize) -> Result<&'a [u8], ParseError> {
        self.data.get(offset..).ok_or(ParseError::OutOfBounds {
            offset,
            needed: 0,
            len: self.data.len(),
        })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], ParseError> {
        let bytes = self.slice(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
