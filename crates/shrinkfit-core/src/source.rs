//! The immutable image handle the engine operates on.

use bytes::Bytes;

use crate::decode::read_dimensions;
use crate::error::CompressResult;

/// An encoded image: opaque bytes plus the pixel dimensions they decode to.
///
/// Cloning is cheap; the byte buffer is reference counted and never mutated.
/// Candidates produced by the engine are new `Image` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Bytes,
    width: u32,
    height: u32,
}

impl Image {
    /// Load an image, reading its dimensions from the header.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::Decode` if the bytes are not a recognizable image.
    pub fn from_bytes(data: impl Into<Bytes>) -> CompressResult<Self> {
        let data = data.into();
        let (width, height) = read_dimensions(&data)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wrap bytes whose dimensions are already known, e.g. freshly encoded output.
    pub fn from_parts(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}
