use std::{borrow::Borrow, time::Duration};

use mdpipe_core::{JobEvent, JobEventKind};
use mdpipe_model::JobStatus;
use tracing::{error, info, trace, warn};

/// Field accessors with log-friendly fallbacks.
pub trait View {
    fn kind(&self) -> JobEventKind;
    fn as_job(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn status(&self) -> Option<JobStatus>;
    fn elapsed_ms(&self) -> u64;
    fn timeout_secs(&self) -> u64;
    fn jobs(&self) -> usize;
    fn workers(&self) -> usize;
}

impl<T> View for T
where
    T: Borrow<JobEvent>,
{
    #[inline]
    fn kind(&self) -> JobEventKind {
        self.borrow().kind
    }
    #[inline]
    fn as_job(&self) -> &str {
        self.borrow()
            .job
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("")
    }
    #[inline]
    fn status(&self) -> Option<JobStatus> {
        self.borrow().status
    }
    #[inline]
    fn elapsed_ms(&self) -> u64 {
        self.borrow()
            .elapsed
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
    #[inline]
    fn timeout_secs(&self) -> u64 {
        self.borrow().timeout_secs.unwrap_or(0)
    }
    #[inline]
    fn jobs(&self) -> usize {
        self.borrow().jobs.unwrap_or(0)
    }
    #[inline]
    fn workers(&self) -> usize {
        self.borrow().workers.unwrap_or(0)
    }
}

#[inline]
pub fn message_for(kind: JobEventKind, status: Option<JobStatus>) -> &'static str {
    match (kind, status) {
        (JobEventKind::BatchStarted, _) => "batch started",
        (JobEventKind::Dispatched, _) => "job queued",
        (JobEventKind::Started, _) => "job started",
        (JobEventKind::Finished, Some(JobStatus::Success)) => "job completed successfully",
        (JobEventKind::Finished, Some(JobStatus::Failed)) => "job failed",
        (JobEventKind::Finished, Some(JobStatus::TimedOut)) => "job exceeded its timeout and was killed",
        (JobEventKind::Finished, Some(JobStatus::Error)) => "job could not be run",
        (JobEventKind::Finished, _) => "job finished",
        (JobEventKind::BatchFinished, _) => "batch finished; all jobs settled",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind(), e.status());

    match e.kind() {
        JobEventKind::BatchStarted => {
            info!(target: "mdpipe.journal", jobs = e.jobs(), workers = e.workers(), "{msg}")
        }
        JobEventKind::Dispatched => trace!(target: "mdpipe.journal", job = e.as_job(), "{msg}"),
        JobEventKind::Started => {
            info!(target: "mdpipe.journal", job = e.as_job(), timeout_secs = e.timeout_secs(), "{msg}")
        }
        JobEventKind::Finished => match e.status() {
            Some(JobStatus::Success) => {
                info!(target: "mdpipe.journal", job = e.as_job(), elapsed_ms = e.elapsed_ms(), "{msg}")
            }
            Some(JobStatus::Failed) | Some(JobStatus::TimedOut) => warn!(
                target: "mdpipe.journal",
                job = e.as_job(),
                elapsed_ms = e.elapsed_ms(),
                reason = e.as_reason(),
                "{msg}"
            ),
            _ => error!(
                target: "mdpipe.journal",
                job = e.as_job(),
                elapsed_ms = e.elapsed_ms(),
                reason = e.as_reason(),
                "{msg}"
            ),
        },
        JobEventKind::BatchFinished => {
            info!(target: "mdpipe.journal", jobs = e.jobs(), elapsed_ms = e.elapsed_ms(), "{msg}")
        }
    }
}
