use mdpipe_model::{JobId, TransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // catalog configuration
    #[error("duplicate job id in catalog: {0}")]
    DuplicateJob(JobId),
    #[error("job id must not be empty")]
    EmptyJobId,
    #[error("job {0}: timeout must be a positive number of seconds")]
    InvalidTimeout(JobId),

    // result bookkeeping
    #[error("job {0} was never dispatched")]
    UnknownJob(JobId),
    #[error("job {0}: only terminal results can be recorded")]
    NotTerminal(JobId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}
