//! Per-job progress handle given to processors.

use std::sync::Weak;

use crate::job::JobId;
use crate::queue::Shared;

/// Reports progress for one running job.
///
/// Cloneable and `Send`, so it can be moved onto a blocking thread. Reports
/// are dropped once the job has left the running state or the queue is gone.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    id: JobId,
    shared: Weak<Shared>,
}

impl ProgressReporter {
    pub(crate) fn new(id: JobId, shared: Weak<Shared>) -> Self {
        Self { id, shared }
    }

    pub fn job_id(&self) -> JobId {
        self.id
    }

    /// Set progress (clamped to 0..=100) and the status message.
    pub fn report(&self, percent: f32, message: impl Into<String>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.apply_progress(self.id, clamp_percent(percent), message.into());
        }
    }
}

/// NaN counts as no progress.
fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}
