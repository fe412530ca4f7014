//! Compression parameters and their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{CompressError, CompressResult};
use crate::format::OutputFormat;

/// Default fixed encoder quality.
pub const DEFAULT_QUALITY: f64 = 0.92;
/// Default early-exit tolerance below the target (1 MiB).
pub const DEFAULT_TOLERANCE: u64 = 1024 * 1024;
/// Default smallest scale the search may try.
pub const DEFAULT_MIN_SCALE: f64 = 0.1;
/// Default cap on probe evaluations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Caller-supplied overrides. Unset fields fall back to the defaults above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Fixed encoder quality in `[0, 1]`.
    pub quality: Option<f64>,
    /// Acceptable gap below the target, in bytes.
    pub tolerance: Option<u64>,
    /// Smallest scale to consider, in `(0, 1]`.
    pub min_scale: Option<f64>,
    /// Maximum number of probes.
    pub max_iterations: Option<u32>,
    /// Output encoding.
    pub format: Option<OutputFormat>,
}

impl CompressionOptions {
    /// Merge over the defaults and validate against `target_size`.
    pub fn resolve(&self, target_size: u64) -> CompressResult<CompressionParameters> {
        let params = CompressionParameters {
            target_size,
            tolerance: self.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            quality: self.quality.unwrap_or(DEFAULT_QUALITY),
            min_scale: self.min_scale.unwrap_or(DEFAULT_MIN_SCALE),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            format: self.format.unwrap_or_default(),
        };
        params.validate()?;
        Ok(params)
    }
}

/// Fully resolved, immutable parameters for one compression run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionParameters {
    /// Hard ceiling: the output must be strictly smaller than this.
    pub target_size: u64,
    pub tolerance: u64,
    pub quality: f64,
    pub min_scale: f64,
    pub max_iterations: u32,
    pub format: OutputFormat,
}

impl CompressionParameters {
    /// Parameters with every default applied.
    pub fn new(target_size: u64) -> Self {
        Self {
            target_size,
            tolerance: DEFAULT_TOLERANCE,
            quality: DEFAULT_QUALITY,
            min_scale: DEFAULT_MIN_SCALE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            format: OutputFormat::default(),
        }
    }

    pub fn validate(&self) -> CompressResult<()> {
        if self.target_size == 0 {
            return Err(CompressError::invalid("target size must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(CompressError::invalid(format!(
                "quality must be between 0 and 1, got {}",
                self.quality
            )));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= 1.0) {
            return Err(CompressError::invalid(format!(
                "minimum scale must be in (0, 1], got {}",
                self.min_scale
            )));
        }
        if self.max_iterations == 0 {
            return Err(CompressError::invalid("max iterations must be at least 1"));
        }
        Ok(())
    }
}
