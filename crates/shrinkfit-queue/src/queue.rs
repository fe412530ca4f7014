//! Bounded-concurrency FIFO job queue.
//!
//! Jobs start in submission order whenever a slot is free. All job state sits
//! behind one mutex that is held only for bookkeeping; processors run as
//! tokio tasks with no lock held. A failed or panicking processor marks only
//! its own job as failed and frees its slot.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::BatchConfig;
use crate::error::{JobError, QueueError};
use crate::events::QueueEvent;
use crate::job::{Job, JobContext, JobId, JobSnapshot, JobStatus, QueueStats};
use crate::progress::ProgressReporter;

/// Events buffered per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Work performed for each job.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    async fn process(&self, job: JobContext) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`JobProcessor`].
pub struct FnProcessor<F>(F);

pub fn processor_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnProcessor(f)
}

#[async_trait]
impl<F, Fut> JobProcessor for FnProcessor<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn process(&self, job: JobContext) -> anyhow::Result<()> {
        (self.0)(job).await
    }
}

struct State {
    /// Every job not yet cleared, in submission order.
    jobs: Vec<Job>,
    pending: VecDeque<JobId>,
    limit: usize,
    in_flight: usize,
    next_sequence: u64,
}

impl State {
    fn find(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    fn find_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    fn stats(&self) -> QueueStats {
        QueueStats::from_statuses(self.jobs.iter().map(|job| job.status))
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

pub(crate) struct Shared {
    state: Mutex<State>,
    processor: Arc<dyn JobProcessor>,
    runtime: Handle,
    events: broadcast::Sender<QueueEvent>,
    idle: Notify,
}

impl Shared {
    fn emit_job(&self, state: &State, job: JobSnapshot) {
        // No subscribers is fine.
        let _ = self.events.send(QueueEvent::JobChanged {
            job,
            stats: state.stats(),
        });
    }

    fn enqueue(&self, state: &mut State, name: String, payload: Bytes) -> JobId {
        let job = Job::new(name, payload, state.next_sequence);
        state.next_sequence += 1;

        let id = job.id;
        debug!(job = %id, name = %job.name, size = job.size, "job queued");
        let snapshot = job.snapshot();
        state.jobs.push(job);
        state.pending.push_back(id);
        self.emit_job(state, snapshot);
        id
    }

    /// Mark queued jobs running while slots are free. The caller spawns the
    /// returned contexts after releasing the lock.
    fn start_ready(self: &Arc<Self>, state: &mut State) -> Vec<JobContext> {
        let mut started = Vec::new();

        while state.in_flight < state.limit {
            let Some(id) = state.pending.pop_front() else {
                break;
            };
            let Some(job) = state.find_mut(id) else {
                continue;
            };
            if job.status != JobStatus::Queued {
                continue;
            }

            job.status = JobStatus::Running;
            job.message = "Processing".to_string();
            let context = JobContext {
                id,
                name: job.name.clone(),
                payload: std::mem::take(&mut job.payload),
                reporter: ProgressReporter::new(id, Arc::downgrade(self)),
            };
            let snapshot = job.snapshot();

            state.in_flight += 1;
            self.emit_job(state, snapshot);
            started.push(context);
        }

        started
    }

    fn spawn_all(self: &Arc<Self>, started: Vec<JobContext>) {
        for context in started {
            self.spawn_job(context);
        }
    }

    fn spawn_job(self: &Arc<Self>, context: JobContext) {
        let id = context.id;
        let span = info_span!("job", id = %id, name = %context.name);

        let processor = Arc::clone(&self.processor);
        let work = self
            .runtime
            .spawn(async move { processor.process(context).await }.instrument(span.clone()));

        let shared = Arc::clone(self);
        self.runtime.spawn(
            async move {
                let outcome = match work.await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(JobError::from(err)),
                    Err(err) if err.is_panic() => {
                        Err(JobError::Panicked(panic_message(err.into_panic())))
                    }
                    Err(err) => Err(JobError::Processing(anyhow::Error::new(err))),
                };
                shared.finish(id, outcome);
            }
            .instrument(span),
        );
    }

    fn finish(self: &Arc<Self>, id: JobId, outcome: Result<(), JobError>) {
        let started = {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);

            if let Some(job) = state.find_mut(id) {
                match outcome {
                    Ok(()) => {
                        job.status = JobStatus::Completed;
                        job.progress = 100.0;
                        job.message = "Completed".to_string();
                        info!("job completed");
                    }
                    Err(err) => {
                        job.status = JobStatus::Failed;
                        job.message = "Failed".to_string();
                        warn!(error = %err, "job failed");
                        job.error = Some(err.to_string());
                    }
                }
                let snapshot = job.snapshot();
                self.emit_job(&state, snapshot);
            }

            let started = self.start_ready(&mut state);
            if state.is_idle() {
                self.idle.notify_waiters();
            }
            started
        };

        self.spawn_all(started);
    }

    pub(crate) fn apply_progress(&self, id: JobId, percent: f32, message: String) {
        let mut state = self.state.lock();
        let Some(job) = state.find_mut(id) else {
            return;
        };
        if job.status != JobStatus::Running {
            return;
        }

        job.progress = percent;
        job.message = message;
        let snapshot = job.snapshot();
        self.emit_job(&state, snapshot);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a running queue. Clones share the same queue.
#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<Shared>,
}

impl JobQueue {
    /// Create a queue running at most `concurrency_limit` jobs at once
    /// (clamped to at least 1). Must be called inside a tokio runtime.
    pub fn new(concurrency_limit: usize, processor: impl JobProcessor) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    jobs: Vec::new(),
                    pending: VecDeque::new(),
                    limit: concurrency_limit.max(1),
                    in_flight: 0,
                    next_sequence: 0,
                }),
                processor: Arc::new(processor),
                runtime,
                events,
                idle: Notify::new(),
            }),
        })
    }

    /// Create a queue sized by a batch config's `concurrency`.
    ///
    /// Pair with [`CompressionProcessor::from_config`](crate::CompressionProcessor::from_config)
    /// to run a whole batch from one config file.
    pub fn from_config(
        config: &BatchConfig,
        processor: impl JobProcessor,
    ) -> Result<Self, QueueError> {
        Self::new(config.concurrency, processor)
    }

    /// Append a job and start it if a slot is free.
    pub fn submit(&self, name: impl Into<String>, payload: impl Into<Bytes>) -> JobId {
        let (id, started) = {
            let mut state = self.shared.state.lock();
            let id = self.shared.enqueue(&mut state, name.into(), payload.into());
            (id, self.shared.start_ready(&mut state))
        };

        self.shared.spawn_all(started);
        id
    }

    /// Append several jobs in order, then dispatch once.
    pub fn submit_batch<I, N, P>(&self, items: I) -> Vec<JobId>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<Bytes>,
    {
        let (ids, started) = {
            let mut state = self.shared.state.lock();
            let ids: Vec<JobId> = items
                .into_iter()
                .map(|(name, payload)| self.shared.enqueue(&mut state, name.into(), payload.into()))
                .collect();
            (ids, self.shared.start_ready(&mut state))
        };

        self.shared.spawn_all(started);
        ids
    }

    /// Cancel a job that has not started yet. Returns false for running,
    /// finished or unknown jobs, which are left untouched.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut state = self.shared.state.lock();
        let Some(job) = state.find_mut(id) else {
            return false;
        };
        if job.status != JobStatus::Queued {
            return false;
        }

        job.status = JobStatus::Cancelled;
        job.message = "Cancelled".to_string();
        job.payload = Bytes::new();
        let snapshot = job.snapshot();

        state.pending.retain(|pending| *pending != id);
        debug!(job = %id, "job cancelled");
        self.shared.emit_job(&state, snapshot);

        if state.is_idle() {
            self.shared.idle.notify_waiters();
        }
        true
    }

    /// Change the limit (clamped to at least 1). Running jobs are never
    /// interrupted; a higher limit starts queued jobs right away.
    pub fn set_concurrency_limit(&self, limit: usize) {
        let started = {
            let mut state = self.shared.state.lock();
            state.limit = limit.max(1);
            debug!(limit = state.limit, "concurrency limit changed");
            self.shared.start_ready(&mut state)
        };

        self.shared.spawn_all(started);
    }

    pub fn concurrency_limit(&self) -> usize {
        self.shared.state.lock().limit
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.state.lock().stats()
    }

    pub fn job(&self, id: JobId) -> Option<JobSnapshot> {
        self.shared.state.lock().find(id).map(Job::snapshot)
    }

    /// Every job not yet cleared, in submission order.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        self.shared.state.lock().jobs.iter().map(Job::snapshot).collect()
    }

    /// Drop completed, failed and cancelled jobs. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut state = self.shared.state.lock();
        let before = state.jobs.len();
        state.jobs.retain(|job| !job.status.is_terminal());
        let removed = before - state.jobs.len();

        debug!(removed, "cleared finished jobs");
        let _ = self.shared.events.send(QueueEvent::Cleared {
            removed,
            stats: state.stats(),
        });
        removed
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.events.subscribe()
    }

    /// True when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.shared.state.lock().is_idle()
    }

    /// Resolve once nothing is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.shared.idle.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("JobQueue")
            .field("limit", &state.limit)
            .field("in_flight", &state.in_flight)
            .field("stats", &state.stats())
            .finish()
    }
}
