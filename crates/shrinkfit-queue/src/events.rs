//! Queue-wide change notifications.

use serde::Serialize;

use crate::job::{JobSnapshot, QueueStats};

/// Broadcast to every subscriber after each state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    /// A job changed status, progress or message.
    JobChanged { job: JobSnapshot, stats: QueueStats },
    /// Finished jobs were dropped by `clear_finished`.
    Cleared { removed: usize, stats: QueueStats },
}

impl QueueEvent {
    pub fn stats(&self) -> &QueueStats {
        match self {
            Self::JobChanged { stats, .. } | Self::Cleared { stats, .. } => stats,
        }
    }

    /// The job this event is about, if any.
    pub fn job(&self) -> Option<&JobSnapshot> {
        match self {
            Self::JobChanged { job, .. } => Some(job),
            Self::Cleared { .. } => None,
        }
    }
}
