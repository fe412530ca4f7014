//! Compression pipeline: pre-check, parameter resolution and result assembly.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::info;

use crate::backend::{ImageBackend, RenderBackend};
use crate::error::CompressResult;
use crate::format::OutputFormat;
use crate::params::CompressionOptions;
use crate::search::{ScaleSearch, SearchProgress};
use crate::source::Image;

/// Outcome of a single compression call.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// The output image (the input itself when nothing was done).
    pub image: Image,
    pub original_size: u64,
    pub final_size: u64,
    /// False when the input already fit under the target.
    pub was_compressed: bool,
    /// 1.0 when untouched.
    pub final_scale: f64,
    /// Encoder quality used, 1.0 when untouched.
    pub final_quality: f64,
    /// Output dimensions, `None` when untouched.
    pub final_width: Option<u32>,
    pub final_height: Option<u32>,
    /// `final_size / original_size`.
    pub compression_ratio: f64,
    /// Number of probes performed.
    pub iterations: u32,
    /// Wall-clock time from entry to result.
    pub duration: Duration,
    /// `target_size - final_size`; positive means headroom.
    pub size_difference: i64,
    /// Output encoding, `None` when untouched.
    pub output_format: Option<OutputFormat>,
}

impl CompressionResult {
    /// Percentage of bytes saved relative to the original.
    pub fn savings_percent(&self) -> f64 {
        (1.0 - self.compression_ratio) * 100.0
    }
}

/// Runs the scale search behind a fixed render backend.
#[derive(Debug, Clone, Default)]
pub struct CompressionPipeline<B: RenderBackend = ImageBackend> {
    backend: B,
}

impl CompressionPipeline<ImageBackend> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: RenderBackend> CompressionPipeline<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shrink `image` so its encoding is strictly smaller than `target_size`.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` for rejected options, otherwise whatever the
    /// search reports (`Decode`, `Render`, `UnsatisfiableTarget`).
    pub fn compress(
        &self,
        image: &Image,
        target_size: u64,
        options: &CompressionOptions,
    ) -> CompressResult<CompressionResult> {
        self.compress_with_progress(image, target_size, options, |_| {})
    }

    /// Like [`compress`](Self::compress), reporting every probe to `on_progress`.
    #[tracing::instrument(
        name = "compress",
        skip_all,
        fields(
            width = image.width(),
            height = image.height(),
            original_size = image.size(),
            target_size = target_size,
        )
    )]
    pub fn compress_with_progress(
        &self,
        image: &Image,
        target_size: u64,
        options: &CompressionOptions,
        mut on_progress: impl FnMut(&SearchProgress),
    ) -> CompressResult<CompressionResult> {
        let started = Instant::now();
        let original_size = image.size();

        if original_size <= target_size {
            info!("already under target, skipping");
            return Ok(CompressionResult {
                image: image.clone(),
                original_size,
                final_size: original_size,
                was_compressed: false,
                final_scale: 1.0,
                final_quality: 1.0,
                final_width: None,
                final_height: None,
                compression_ratio: 1.0,
                iterations: 0,
                duration: started.elapsed(),
                size_difference: signed_gap(target_size, original_size),
                output_format: None,
            });
        }

        let params = options.resolve(target_size)?;
        let outcome =
            ScaleSearch::new(&self.backend).run(image, &params, &mut on_progress)?;

        let best = outcome.best;
        let final_size = best.size();
        let result = CompressionResult {
            original_size,
            final_size,
            was_compressed: true,
            final_scale: best.scale,
            final_quality: params.quality,
            final_width: Some(best.width),
            final_height: Some(best.height),
            compression_ratio: ratio(final_size, original_size),
            iterations: outcome.iterations,
            duration: started.elapsed(),
            size_difference: signed_gap(target_size, final_size),
            output_format: Some(params.format),
            image: best.image,
        };

        info!(
            final_size,
            scale = result.final_scale,
            iterations = result.iterations,
            elapsed_ms = result.duration.as_millis() as u64,
            "compressed"
        );
        Ok(result)
    }

    /// Load `bytes` as an image and compress it.
    pub fn compress_bytes(
        &self,
        bytes: impl Into<Bytes>,
        target_size: u64,
        options: &CompressionOptions,
    ) -> CompressResult<CompressionResult> {
        let image = Image::from_bytes(bytes)?;
        self.compress(&image, target_size, options)
    }
}

fn ratio(final_size: u64, original_size: u64) -> f64 {
    if original_size == 0 {
        1.0
    } else {
        final_size as f64 / original_size as f64
    }
}

fn signed_gap(target: u64, size: u64) -> i64 {
    let diff = i128::from(target) - i128::from(size);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}
