//! Shrinkfit Queue - bounded concurrent job scheduling
//!
//! [`JobQueue`] runs arbitrary [`JobProcessor`]s over a fixed number of
//! slots in FIFO order, tracks each job's lifecycle and broadcasts
//! [`QueueEvent`]s on every change. [`CompressionProcessor`] is the
//! ready-made processor that fits each payload under a byte budget and hands
//! the result to an [`OutputSink`].

pub mod config;
pub mod error;
pub mod events;
pub mod job;
pub mod processor;
pub mod progress;
pub mod queue;
pub mod sink;
pub mod utils;

pub use config::{BatchConfig, DEFAULT_CONCURRENCY, DEFAULT_TARGET_SIZE};
pub use error::{ConfigError, JobError, QueueError};
pub use events::QueueEvent;
pub use job::{JobContext, JobId, JobSnapshot, JobStatus, QueueStats};
pub use processor::CompressionProcessor;
pub use progress::ProgressReporter;
pub use queue::{processor_fn, FnProcessor, JobProcessor, JobQueue, EVENT_CHANNEL_CAPACITY};
pub use sink::{DirectorySink, MemorySink, OutputSink, StoredOutput};
pub use utils::format_size;
