use std::time::{Duration, SystemTime};

use crate::{JobId, JobStatus, TransitionError};

/// Terminal outcome reported by an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: JobStatus,
    pub elapsed: Duration,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl Outcome {
    pub fn success(elapsed: Duration) -> Self {
        Self {
            status: JobStatus::Success,
            elapsed,
            exit_code: Some(0),
            error: None,
        }
    }

    pub fn failed(elapsed: Duration, exit_code: Option<i32>, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            elapsed,
            exit_code,
            error: Some(error.into()),
        }
    }

    /// Elapsed time of a timed-out job is its budget, not the measured time.
    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            status: JobStatus::TimedOut,
            elapsed: timeout,
            exit_code: None,
            error: Some(format!("execution timeout (>{}s)", timeout.as_secs())),
        }
    }

    pub fn error(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            elapsed,
            exit_code: None,
            error: Some(error.into()),
        }
    }
}

/// Result of one job within one batch run.
///
/// Created `Pending` at dispatch, moved to `Running` once, then to exactly one
/// terminal state. Terminal results reject every further transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub job_id: JobId,
    pub status: JobStatus,
    pub started_at: Option<SystemTime>,
    pub elapsed: Duration,
    pub exit_code: Option<i32>,
    /// Bounded excerpt of the error stream, or a description of what went wrong.
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            started_at: None,
            elapsed: Duration::ZERO,
            exit_code: None,
            error: None,
        }
    }

    /// Pending → Running.
    pub fn begin(&mut self, started_at: SystemTime) -> Result<(), TransitionError> {
        self.guard_open()?;
        if self.status != JobStatus::Pending {
            return Err(TransitionError::Invalid {
                id: self.job_id.clone(),
                from: self.status,
                to: JobStatus::Running,
            });
        }
        self.status = JobStatus::Running;
        self.started_at = Some(started_at);
        Ok(())
    }

    /// Running → terminal, or Pending → Error for jobs that never got to start.
    pub fn finish(&mut self, outcome: Outcome) -> Result<(), TransitionError> {
        self.guard_open()?;

        let allowed = outcome.status.is_terminal()
            && (self.status == JobStatus::Running || outcome.status == JobStatus::Error);
        if !allowed {
            return Err(TransitionError::Invalid {
                id: self.job_id.clone(),
                from: self.status,
                to: outcome.status,
            });
        }

        self.status = outcome.status;
        self.elapsed = outcome.elapsed;
        self.exit_code = outcome.exit_code;
        self.error = outcome.error;
        Ok(())
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// First line of the error text, if any.
    pub fn error_headline(&self) -> Option<&str> {
        self.error
            .as_deref()
            .and_then(|e| e.lines().map(str::trim).find(|l| !l.is_empty()))
    }

    fn guard_open(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                id: self.job_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }
}
