//! Job model: identifiers, lifecycle states, snapshots and derived stats.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::ProgressReporter;

/// Unique job identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Job lifecycle state.
///
/// `Queued -> Running -> {Completed | Failed}`, or `Queued -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Point-in-time copy of a job as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    /// Percent complete, 0 to 100.
    pub progress: f32,
    pub message: String,
    /// Failure detail, set only for failed jobs.
    pub error: Option<String>,
    /// Payload size in bytes.
    pub size: u64,
    /// Position in submission order, starting at 0.
    pub sequence: u64,
}

/// Counts per status, recomputed from the live job set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl QueueStats {
    pub(crate) fn from_statuses(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut stats, status| {
            match status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
            stats.total += 1;
            stats
        })
    }

    /// Jobs that are queued or running.
    pub fn active(&self) -> usize {
        self.queued + self.running
    }
}

/// What a processor receives when its job starts.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub id: JobId,
    pub name: String,
    pub payload: Bytes,
    pub reporter: ProgressReporter,
}

/// Queue-owned job record.
#[derive(Debug)]
pub(crate) struct Job {
    pub id: JobId,
    pub name: String,
    /// Emptied when the job is handed to its processor.
    pub payload: Bytes,
    pub size: u64,
    pub status: JobStatus,
    pub progress: f32,
    pub message: String,
    pub error: Option<String>,
    pub sequence: u64,
}

impl Job {
    pub fn new(name: String, payload: Bytes, sequence: u64) -> Self {
        Self {
            id: JobId::new(),
            name,
            size: payload.len() as u64,
            payload,
            status: JobStatus::Queued,
            progress: 0.0,
            message: "Queued".to_string(),
            error: None,
            sequence,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            error: self.error.clone(),
            size: self.size,
            sequence: self.sequence,
        }
    }
}
