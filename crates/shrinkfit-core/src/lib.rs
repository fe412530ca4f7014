//! Shrinkfit Core - adaptive recompression engine
//!
//! Shrinks an encoded image until it fits strictly under a byte budget while
//! holding encoder quality fixed. Only resolution varies: a bounded binary
//! search over the scale factor ([`ScaleSearch`]) drives a stateless probe
//! ([`SizeProbe`]) that renders candidates through a [`RenderBackend`].
//! [`CompressionPipeline`] wraps the search with a pre-check, defaults and
//! result statistics.

pub mod backend;
pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod params;
pub mod pipeline;
pub mod probe;
pub mod search;
pub mod source;

#[cfg(test)]
mod test_support;

pub use backend::{ImageBackend, RenderBackend};
pub use decode::FilterType;
pub use error::{CompressError, CompressResult};
pub use format::OutputFormat;
pub use params::{
    CompressionOptions, CompressionParameters, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_SCALE,
    DEFAULT_QUALITY, DEFAULT_TOLERANCE,
};
pub use pipeline::{CompressionPipeline, CompressionResult};
pub use probe::{SearchCandidate, SizeProbe};
pub use search::{ScaleSearch, SearchOutcome, SearchProgress, EARLY_EXIT_GAP, SCALE_RESOLUTION};
pub use source::Image;
