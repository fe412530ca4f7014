//! Source decoding for the recompression engine.
//!
//! This module provides functionality for:
//! - Reading image dimensions from the header without decoding pixels
//! - Decoding any supported source (JPEG, PNG, WebP) to RGB pixel data
//! - Resampling decoded pixels to the dimensions of a scaled candidate

mod resize;
mod types;

use std::io::Cursor;

use image::ImageReader;

use crate::error::{CompressError, CompressResult};

pub use resize::{resize, scaled_dimensions};
pub use types::{DecodedImage, FilterType};

/// Read the pixel dimensions of an encoded image.
///
/// Only the header is parsed, so this is cheap even for large sources.
///
/// # Errors
///
/// Returns `CompressError::Decode` if the format is not recognized or the
/// header is malformed.
pub fn read_dimensions(bytes: &[u8]) -> CompressResult<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressError::decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(CompressError::decode("unrecognized image format"));
    }

    reader
        .into_dimensions()
        .map_err(|e| CompressError::decode(e.to_string()))
}

/// Decode an encoded image to RGB pixel data.
///
/// Alpha channels are dropped; the engine only produces opaque outputs.
pub fn decode_rgb(bytes: &[u8]) -> CompressResult<DecodedImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressError::decode(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| CompressError::decode(e.to_string()))?;

    Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
}
