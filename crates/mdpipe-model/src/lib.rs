//! Public data model of the mdpipe batch orchestrator.
//!
//! Everything the scheduler, executors and report writers exchange lives here:
//! job descriptors, per-job execution results, the post-barrier [`Summary`] and
//! the persisted [`SummaryRecord`].

mod domain;
pub use domain::*;

mod error;
pub use error::TransitionError;

/// Default wall-clock budget for a single job, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Default number of stderr bytes kept for the error excerpt.
pub const DEFAULT_EXCERPT_BYTES: usize = 1000;
