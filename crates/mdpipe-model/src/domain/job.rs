use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_TIMEOUT_SECS, JobId, JobTarget};

/// One independently executable analysis unit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Human readable name shown in reports.
    pub description: String,
    pub target: JobTarget,
    /// Wall-clock budget; the process tree is killed once it elapses.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Job {
    pub fn new(id: impl Into<JobId>, description: impl Into<String>, target: JobTarget) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            target,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
