//! Size probing: re-encode a source at one scale and report what it costs.

use crate::backend::RenderBackend;
use crate::decode::scaled_dimensions;
use crate::error::{CompressError, CompressResult};
use crate::format::OutputFormat;
use crate::source::Image;

/// One re-encoded candidate produced during a search.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    /// Scale factor applied to both source dimensions.
    pub scale: f64,
    /// Candidate width in pixels.
    pub width: u32,
    /// Candidate height in pixels.
    pub height: u32,
    /// The encoded candidate.
    pub image: Image,
}

impl SearchCandidate {
    /// Encoded size in bytes.
    pub fn size(&self) -> u64 {
        self.image.size()
    }
}

/// Stateless probe over a render backend.
#[derive(Clone, Copy)]
pub struct SizeProbe<'a> {
    backend: &'a dyn RenderBackend,
}

impl<'a> SizeProbe<'a> {
    pub fn new(backend: &'a dyn RenderBackend) -> Self {
        Self { backend }
    }

    /// Re-encode `source` at `scale` with fixed `quality` in `format`.
    ///
    /// Target dimensions are `round(width * scale) x round(height * scale)`.
    ///
    /// # Errors
    ///
    /// `CompressError::Render` if `scale` is outside `(0, 1]`, `quality` is
    /// outside `[0, 1]`, or the backend cannot resample/encode.
    /// `CompressError::Decode` if the backend cannot read the source.
    pub fn probe(
        &self,
        source: &Image,
        scale: f64,
        quality: f64,
        format: OutputFormat,
    ) -> CompressResult<SearchCandidate> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(CompressError::render(format!(
                "scale {scale} outside (0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&quality) {
            return Err(CompressError::render(format!(
                "quality {quality} outside [0, 1]"
            )));
        }

        let (width, height) = scaled_dimensions(source.width(), source.height(), scale);
        let encoded = self
            .backend
            .render(source.data(), width, height, quality, format)?;

        Ok(SearchCandidate {
            scale,
            width,
            height,
            image: Image::from_parts(encoded, width, height),
        })
    }
}
