//! Job lifecycle events and the subscriber seam.
//!
//! Events are delivered synchronously from the worker that produced them, in
//! program order for a given job: `Dispatched` → `Started` → `Finished`.
//! `Started` is emitted after the worker slot was acquired and `Finished`
//! before it is released, so a subscriber counting the two always sees at
//! most `workers` jobs in between.

use std::time::{Duration, SystemTime};

use mdpipe_model::{ExecutionResult, JobId, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    /// A batch is about to dispatch its jobs.
    BatchStarted,
    /// A job entered the queue (`Pending`).
    Dispatched,
    /// A job acquired a worker slot (`Running`).
    Started,
    /// A job reached a terminal state.
    Finished,
    /// Every job is terminal; the summary is about to be built.
    BatchFinished,
}

#[derive(Debug, Clone)]
pub struct JobEvent {
    pub kind: JobEventKind,
    pub at: SystemTime,
    pub job: Option<JobId>,
    pub status: Option<JobStatus>,
    pub elapsed: Option<Duration>,
    pub timeout_secs: Option<u64>,
    pub reason: Option<String>,
    /// Batch size on `BatchStarted`/`BatchFinished`.
    pub jobs: Option<usize>,
    /// Pool capacity on `BatchStarted`.
    pub workers: Option<usize>,
}

impl JobEvent {
    fn new(kind: JobEventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            job: None,
            status: None,
            elapsed: None,
            timeout_secs: None,
            reason: None,
            jobs: None,
            workers: None,
        }
    }

    pub fn batch_started(jobs: usize, workers: usize) -> Self {
        Self {
            jobs: Some(jobs),
            workers: Some(workers),
            ..Self::new(JobEventKind::BatchStarted)
        }
    }

    pub fn batch_finished(jobs: usize, elapsed: Duration) -> Self {
        Self {
            jobs: Some(jobs),
            elapsed: Some(elapsed),
            ..Self::new(JobEventKind::BatchFinished)
        }
    }

    pub fn dispatched(job: &JobId) -> Self {
        Self {
            job: Some(job.clone()),
            status: Some(JobStatus::Pending),
            ..Self::new(JobEventKind::Dispatched)
        }
    }

    pub fn started(job: &JobId, timeout_secs: u64) -> Self {
        Self {
            job: Some(job.clone()),
            status: Some(JobStatus::Running),
            timeout_secs: Some(timeout_secs),
            ..Self::new(JobEventKind::Started)
        }
    }

    pub fn finished(result: &ExecutionResult) -> Self {
        Self {
            job: Some(result.job_id.clone()),
            status: Some(result.status),
            elapsed: Some(result.elapsed),
            reason: result.error_headline().map(str::to_string),
            ..Self::new(JobEventKind::Finished)
        }
    }
}

/// Receiver of job lifecycle events.
///
/// Called inline on the worker's task; implementations must be cheap and must
/// not block.
pub trait Subscribe: Send + Sync {
    fn on_event(&self, event: &JobEvent);

    fn name(&self) -> &'static str;
}
