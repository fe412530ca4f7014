//! Resampling used to produce scaled candidates.

use super::{DecodedImage, FilterType};
use crate::error::{CompressError, CompressResult};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `CompressError::Render` if either target dimension is zero or the
/// pixel buffer does not match the declared dimensions.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> CompressResult<DecodedImage> {
    if width == 0 || height == 0 {
        return Err(CompressError::render(format!(
            "cannot resample to {width}x{height}"
        )));
    }

    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let view = image
        .as_rgb_view()
        .ok_or_else(|| CompressError::render("pixel buffer does not match dimensions"))?;

    let resized = image::imageops::resize(&view, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Pixel dimensions for a uniform `scale` of `width x height`.
///
/// Each side is rounded to the nearest pixel and never drops below one.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let scale_side = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    (scale_side(width), scale_side(height))
}
