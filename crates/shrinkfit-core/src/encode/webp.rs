//! Lossy WebP encoding for recompressed candidates.

use webp::Encoder;

use super::{validate_rgb, EncodeError};

/// Encode RGB pixel data to lossy WebP bytes.
///
/// `quality` uses the same 1-100 scale as JPEG; values outside it are clamped.
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;

    let quality = quality.clamp(1, 100) as f32;
    let memory = Encoder::from_rgb(pixels, width, height)
        .encode_simple(false, quality)
        .map_err(|e| EncodeError::EncodingFailed(format!("webp: {e:?}")))?;

    Ok(memory.to_vec())
}
