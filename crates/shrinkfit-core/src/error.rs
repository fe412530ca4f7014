//! Error types for the recompression engine.

use thiserror::Error;

/// Errors that can occur while probing, searching or compressing an image.
///
/// None of these are retryable for the same input and parameters: the caller
/// either relaxes the constraints or keeps the untouched original.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The source bytes are not a readable image.
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    /// The resample or encode step could not be performed.
    #[error("Failed to render candidate: {0}")]
    Render(String),

    /// Even the minimum scale produces an output at or above the target size.
    #[error(
        "Target of {target_size} bytes is unreachable for a {width}x{height} image \
         (minimum scale {min_scale})"
    )]
    UnsatisfiableTarget {
        width: u32,
        height: u32,
        min_scale: f64,
        target_size: u64,
    },

    /// Compression options are out of range.
    #[error("Invalid compression parameters: {0}")]
    InvalidParameters(String),
}

impl CompressError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render<T: Into<String>>(msg: T) -> Self {
        Self::Render(msg.into())
    }

    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidParameters(msg.into())
    }
}

/// Convenience result type for engine operations.
pub type CompressResult<T> = Result<T, CompressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsatisfiable_display_carries_context() {
        let err = CompressError::UnsatisfiableTarget {
            width: 4000,
            height: 3000,
            min_scale: 0.1,
            target_size: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("4000x3000"));
        assert!(msg.contains("0.1"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(CompressError::decode("bad"), CompressError::Decode(m) if m == "bad"));
        assert!(matches!(CompressError::render("oops"), CompressError::Render(_)));
        assert_eq!(
            CompressError::invalid("quality").to_string(),
            "Invalid compression parameters: quality"
        );
    }
}
