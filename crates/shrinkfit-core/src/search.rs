//! Binary search over scale for the largest candidate under a size ceiling.
//!
//! Quality is held fixed and only resolution varies. The search assumes the
//! encoded size is non-decreasing in scale, which holds for resampled raster
//! re-encoding at fixed quality but is not guaranteed by every encoder.
//!
//! # Algorithm
//!
//! 1. Start with `low = min_scale`, `high = 1.0`.
//! 2. While under the iteration cap and `high - low` exceeds the 1% floor,
//!    probe at the midpoint. Too large moves `high` down; small enough
//!    becomes the best candidate and moves `low` up.
//! 3. Stop early once an accepted candidate is within both the tolerance and
//!    [`EARLY_EXIT_GAP`] of the target.
//! 4. If nothing fit, probe `min_scale` itself (iterations permitting)
//!    before giving up with [`CompressError::UnsatisfiableTarget`].

use tracing::debug;

use crate::backend::RenderBackend;
use crate::error::{CompressError, CompressResult};
use crate::params::CompressionParameters;
use crate::probe::{SearchCandidate, SizeProbe};
use crate::source::Image;

/// Smallest scale interval worth bisecting further.
pub const SCALE_RESOLUTION: f64 = 0.01;

/// Absolute gap below the target that always counts as close enough (100 KB).
pub const EARLY_EXIT_GAP: u64 = 100 * 1024;

/// Progress event emitted after every probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchProgress {
    /// 1-based probe count.
    pub iteration: u32,
    pub scale: f64,
    pub size: u64,
    pub target_size: u64,
    pub width: u32,
    pub height: u32,
}

/// Result of a successful search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Largest accepted candidate.
    pub best: SearchCandidate,
    /// Number of probes performed.
    pub iterations: u32,
}

/// Bounded binary search driver.
pub struct ScaleSearch<'a> {
    probe: SizeProbe<'a>,
}

impl<'a> ScaleSearch<'a> {
    pub fn new(backend: &'a dyn RenderBackend) -> Self {
        Self {
            probe: SizeProbe::new(backend),
        }
    }

    /// Search for the largest scale whose encoding is strictly smaller than
    /// `params.target_size`.
    ///
    /// # Errors
    ///
    /// Probe failures abort the search unchanged. If no probed scale fits,
    /// returns `CompressError::UnsatisfiableTarget`.
    pub fn run(
        &self,
        source: &Image,
        params: &CompressionParameters,
        on_progress: &mut dyn FnMut(&SearchProgress),
    ) -> CompressResult<SearchOutcome> {
        let target = params.target_size;
        let mut low = params.min_scale;
        let mut high = 1.0_f64;
        let mut best: Option<SearchCandidate> = None;
        let mut iterations = 0u32;

        while iterations < params.max_iterations && high - low > SCALE_RESOLUTION {
            let mid = (low + high) / 2.0;
            let candidate = self.evaluate(source, mid, params, &mut iterations, on_progress)?;
            let size = candidate.size();

            if size >= target {
                debug!(scale = mid, size, target, "candidate too large");
                high = mid;
                continue;
            }

            let gap = target - size;
            debug!(scale = mid, size, target, gap, "candidate fits");
            best = Some(candidate);
            low = mid;

            if gap < params.tolerance && gap < EARLY_EXIT_GAP {
                debug!(iterations, gap, "within tolerance, stopping early");
                break;
            }
        }

        if best.is_none() && iterations < params.max_iterations {
            let candidate =
                self.evaluate(source, params.min_scale, params, &mut iterations, on_progress)?;
            if candidate.size() < target {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) => Ok(SearchOutcome { best, iterations }),
            None => Err(CompressError::UnsatisfiableTarget {
                width: source.width(),
                height: source.height(),
                min_scale: params.min_scale,
                target_size: target,
            }),
        }
    }

    fn evaluate(
        &self,
        source: &Image,
        scale: f64,
        params: &CompressionParameters,
        iterations: &mut u32,
        on_progress: &mut dyn FnMut(&SearchProgress),
    ) -> CompressResult<SearchCandidate> {
        let candidate = self
            .probe
            .probe(source, scale, params.quality, params.format)?;
        *iterations += 1;

        on_progress(&SearchProgress {
            iteration: *iterations,
            scale,
            size: candidate.size(),
            target_size: params.target_size,
            width: candidate.width,
            height: candidate.height,
        });

        Ok(candidate)
    }
}
