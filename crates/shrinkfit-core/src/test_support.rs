//! Deterministic fixtures shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::RenderBackend;
use crate::encode::encode_jpeg;
use crate::error::{CompressError, CompressResult};
use crate::format::OutputFormat;

/// Pseudo-random RGB noise, which compresses poorly and scales predictably.
pub fn noise_pixels(width: u32, height: u32) -> Vec<u8> {
    let len = (width as usize) * (height as usize) * 3;
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

pub fn noise_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    encode_jpeg(&noise_pixels(width, height), width, height, quality)
        .expect("fixture encodes")
}

/// Backend whose output size is exactly `ceil(width * height * bytes_per_pixel)`.
///
/// Size is strictly monotonic in scale, which makes search assertions exact.
pub struct PixelRateBackend {
    pub bytes_per_pixel: f64,
    pub calls: AtomicUsize,
}

impl PixelRateBackend {
    pub fn new(bytes_per_pixel: f64) -> Self {
        Self {
            bytes_per_pixel,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn size_at(&self, width: u32, height: u32) -> u64 {
        (width as f64 * height as f64 * self.bytes_per_pixel).ceil() as u64
    }
}

impl RenderBackend for PixelRateBackend {
    fn render(
        &self,
        _source: &[u8],
        width: u32,
        height: u32,
        _quality: f64,
        _format: OutputFormat,
    ) -> CompressResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0u8; self.size_at(width, height) as usize])
    }
}

/// Backend that always fails to encode.
pub struct BrokenBackend;

impl RenderBackend for BrokenBackend {
    fn render(
        &self,
        _source: &[u8],
        _width: u32,
        _height: u32,
        _quality: f64,
        _format: OutputFormat,
    ) -> CompressResult<Vec<u8>> {
        Err(CompressError::render("encoder unavailable"))
    }
}
