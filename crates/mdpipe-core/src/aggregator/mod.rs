use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime},
};

use mdpipe_model::{ExecutionResult, Job, JobId, JobReport, JobStatus, Summary};
use tracing::trace;

use crate::error::CoreError;

/// Thread-safe accumulation of per-job results for one batch run.
///
/// Every mutation happens inside one critical section, so concurrent workers
/// can report completions without lost updates.
#[derive(Clone, Default)]
pub struct ResultAggregator {
    inner: Arc<Mutex<AggregatorInner>>,
}

#[derive(Default)]
struct AggregatorInner {
    entries: HashMap<JobId, JobReport>,
    running: usize,
    completed: usize,
    succeeded: usize,
    elapsed: Duration,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job as `Pending` (called at dispatch time).
    pub fn dispatch(&self, job: &Job) {
        let mut inner = self.lock();
        inner.entries.insert(
            job.id.clone(),
            JobReport {
                description: job.description.clone(),
                result: ExecutionResult::pending(job.id.clone()),
            },
        );
    }

    /// Move a dispatched job to `Running`.
    pub fn mark_running(&self, id: &JobId, started_at: SystemTime) -> Result<(), CoreError> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownJob(id.clone()))?;
        entry.result.begin(started_at)?;
        inner.running += 1;
        Ok(())
    }

    /// Accept the terminal result of a dispatched job, exactly once.
    pub fn record(&self, result: ExecutionResult) -> Result<(), CoreError> {
        if !result.is_terminal() {
            return Err(CoreError::NotTerminal(result.job_id));
        }

        let mut inner = self.lock();
        let entry = inner
            .entries
            .get_mut(&result.job_id)
            .ok_or_else(|| CoreError::UnknownJob(result.job_id.clone()))?;

        let previous = entry.result.status;
        if previous.is_terminal() {
            return Err(mdpipe_model::TransitionError::AlreadyTerminal {
                id: result.job_id,
                status: previous,
            }
            .into());
        }

        trace!(job = %result.job_id, status = %result.status, "result recorded");
        let elapsed = result.elapsed;
        let success = result.status.is_success();
        entry.result = result;

        if previous == JobStatus::Running {
            inner.running -= 1;
        }
        inner.completed += 1;
        inner.elapsed += elapsed;
        if success {
            inner.succeeded += 1;
        }
        Ok(())
    }

    /// Jobs currently holding a worker slot.
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Jobs that reached a terminal state.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    pub fn success_count(&self) -> usize {
        self.lock().succeeded
    }

    /// Sum of the recorded per-job durations so far.
    pub fn total_elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    pub fn status_of(&self, id: &JobId) -> Option<JobStatus> {
        self.lock().entries.get(id).map(|e| e.result.status)
    }

    /// Build the final [`Summary`]; only meaningful after the scheduler's barrier.
    ///
    /// Every listed job appears exactly once. A job that was never dispatched is
    /// reported with a `Pending` result (rendered as "NOT RUN").
    pub fn finalize(&self, jobs: &[Job]) -> Summary {
        let inner = self.lock();
        let reports = jobs.iter().map(|job| {
            inner.entries.get(&job.id).cloned().unwrap_or_else(|| JobReport {
                description: job.description.clone(),
                result: ExecutionResult::pending(job.id.clone()),
            })
        });
        Summary::new(Summary::now(), reports)
    }
}
