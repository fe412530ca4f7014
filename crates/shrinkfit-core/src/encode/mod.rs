//! Candidate encoding for the recompression engine.
//!
//! This module provides functionality for:
//! - Encoding RGB pixels to JPEG with configurable quality
//! - Encoding RGB pixels to lossy WebP with configurable quality
//!
//! All operations are synchronous. The scheduler runs them on blocking
//! threads, one candidate at a time per job.

mod jpeg;
mod webp;

use thiserror::Error;

use crate::decode::DecodedImage;
use crate::error::CompressError;
use crate::format::{encoder_quality, OutputFormat};

pub use jpeg::encode_jpeg;
pub use webp::encode_webp;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying encoder failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

impl From<EncodeError> for CompressError {
    fn from(err: EncodeError) -> Self {
        CompressError::Render(err.to_string())
    }
}

/// Encode a decoded image in `format`, with `quality` in `[0, 1]`.
pub fn encode(image: &DecodedImage, format: OutputFormat, quality: f64) -> Result<Vec<u8>, EncodeError> {
    let quality = encoder_quality(quality);
    match format {
        OutputFormat::Jpeg => encode_jpeg(&image.pixels, image.width, image.height, quality),
        OutputFormat::Webp => encode_webp(&image.pixels, image.width, image.height, quality),
    }
}

fn validate_rgb(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }

    Ok(())
}
