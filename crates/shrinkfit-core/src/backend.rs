//! Render backends: the decode, resample and encode capability the probe uses.

use std::sync::Arc;

use crate::decode::{decode_rgb, resize, FilterType};
use crate::encode::encode;
use crate::error::{CompressError, CompressResult};
use crate::format::OutputFormat;

/// Turns encoded source bytes into a re-encoded candidate of exact dimensions.
///
/// Implementations must be deterministic for the scale search to be
/// reproducible, and thread-safe so a single backend can serve many jobs.
pub trait RenderBackend: Send + Sync {
    /// Decode `source`, resample it to `width x height` and encode it in
    /// `format` at `quality` (normalized to `[0, 1]`).
    ///
    /// # Errors
    ///
    /// `CompressError::Decode` when `source` is unreadable,
    /// `CompressError::Render` when resampling or encoding fails.
    fn render(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        quality: f64,
        format: OutputFormat,
    ) -> CompressResult<Vec<u8>>;
}

impl<T: RenderBackend + ?Sized> RenderBackend for &T {
    fn render(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        quality: f64,
        format: OutputFormat,
    ) -> CompressResult<Vec<u8>> {
        (**self).render(source, width, height, quality, format)
    }
}

impl<T: RenderBackend + ?Sized> RenderBackend for Arc<T> {
    fn render(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        quality: f64,
        format: OutputFormat,
    ) -> CompressResult<Vec<u8>> {
        (**self).render(source, width, height, quality, format)
    }
}

/// Backend built on the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBackend {
    filter: FilterType,
}

impl ImageBackend {
    /// Backend with the default Lanczos3 filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend using a specific resampling filter.
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

impl RenderBackend for ImageBackend {
    fn render(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        quality: f64,
        format: OutputFormat,
    ) -> CompressResult<Vec<u8>> {
        let decoded = decode_rgb(source)?;

        if width > decoded.width || height > decoded.height {
            return Err(CompressError::render(format!(
                "target {}x{} exceeds source {}x{}",
                width, height, decoded.width, decoded.height
            )));
        }

        let resized = resize(&decoded, width, height, self.filter)?;
        Ok(encode(&resized, format, quality)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::read_dimensions;
    use crate::test_support::noise_jpeg;

    #[test]
    fn test_render_produces_requested_dimensions() {
        let source = noise_jpeg(120, 80, 95);
        let out = ImageBackend::new()
            .render(&source, 60, 40, 0.9, OutputFormat::Jpeg)
            .unwrap();

        assert_eq!(read_dimensions(&out).unwrap(), (60, 40));
    }

    #[test]
    fn test_render_webp() {
        let source = noise_jpeg(64, 64, 95);
        let out = ImageBackend::new()
            .render(&source, 32, 32, 0.9, OutputFormat::Webp)
            .unwrap();

        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(read_dimensions(&out).unwrap(), (32, 32));
    }

    #[test]
    fn test_render_rejects_upscale() {
        let source = noise_jpeg(32, 32, 95);
        let err = ImageBackend::new()
            .render(&source, 64, 64, 0.9, OutputFormat::Jpeg)
            .unwrap_err();

        assert!(matches!(err, CompressError::Render(_)));
    }

    #[test]
    fn test_render_decode_failure() {
        let err = ImageBackend::new()
            .render(b"garbage", 10, 10, 0.9, OutputFormat::Jpeg)
            .unwrap_err();

        assert!(matches!(err, CompressError::Decode(_)));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let source = noise_jpeg(128, 128, 100);
        let backend = ImageBackend::with_filter(FilterType::Bilinear);

        let high = backend.render(&source, 128, 128, 0.95, OutputFormat::Jpeg).unwrap();
        let low = backend.render(&source, 128, 128, 0.30, OutputFormat::Jpeg).unwrap();

        assert!(low.len() < high.len());
    }

    #[test]
    fn test_lower_quality_is_smaller_webp() {
        let source = noise_jpeg(200, 150, 95);
        let backend = ImageBackend::new();

        let low = backend.render(&source, 100, 75, 0.10, OutputFormat::Webp).unwrap();
        let high = backend.render(&source, 100, 75, 0.92, OutputFormat::Webp).unwrap();

        assert!(low.len() < high.len(), "q0.10={} q0.92={}", low.len(), high.len());
        assert_eq!(read_dimensions(&low).unwrap(), (100, 75));
        assert_eq!(read_dimensions(&high).unwrap(), (100, 75));
    }
}
