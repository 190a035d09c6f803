use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job within one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Dispatched, waiting for a worker slot.
    Pending,
    /// Holding a worker slot; the process is (about to be) running.
    Running,
    /// Process exited with code 0.
    Success,
    /// Process ran and exited non-zero (or was killed by a signal).
    Failed,
    /// Process exceeded its wall-clock budget and was killed.
    TimedOut,
    /// Process could not be started: unresolvable target, spawn failure, cancellation.
    Error,
}

impl JobStatus {
    /// Returns `true` if the status can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::TimedOut | JobStatus::Error
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
