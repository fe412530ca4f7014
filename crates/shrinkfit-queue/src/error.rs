//! Error types for the queue, its jobs and batch configuration.

use thiserror::Error;

/// Why a job ended in the failed state. Recorded on the job, never
/// propagated out of the queue.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0:#}")]
    Processing(anyhow::Error),

    #[error("processor panicked: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::Processing(err)
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue must be created inside a tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
