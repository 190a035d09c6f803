use thiserror::Error;

use crate::{JobId, JobStatus};

/// Rejected lifecycle transition of an [`ExecutionResult`](crate::ExecutionResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {id}: cannot move from {from} to {to}")]
    Invalid {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("job {id}: result is already terminal ({status})")]
    AlreadyTerminal { id: JobId, status: JobStatus },
}
