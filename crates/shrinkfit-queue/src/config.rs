//! Batch configuration loaded from JSON.
//!
//! ```json
//! {
//!   "concurrency": 4,
//!   "target_size": 5242880,
//!   "options": { "quality": 0.85, "format": "webp" }
//! }
//! ```
//!
//! `target_size` is required; everything else has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shrinkfit_core::{CompressionOptions, CompressionParameters};

use crate::error::ConfigError;

/// Default number of jobs compressed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default byte budget (5 MiB) used by `BatchConfig::default`.
pub const DEFAULT_TARGET_SIZE: u64 = 5 * 1024 * 1024;

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum jobs running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Every output must be strictly smaller than this many bytes.
    pub target_size: u64,
    /// Engine overrides applied to every job.
    #[serde(default)]
    pub options: CompressionOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            target_size: DEFAULT_TARGET_SIZE,
            options: CompressionOptions::default(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        self.parameters()?;
        Ok(())
    }

    /// Engine parameters every job in this batch runs with.
    pub fn parameters(&self) -> Result<CompressionParameters, ConfigError> {
        self.options
            .resolve(self.target_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Load and validate a config file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let config: BatchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }
}
