use std::{collections::HashSet, sync::Arc};

use mdpipe_model::{Job, JobId};
use tracing::{debug, instrument};

use crate::error::CoreError;

/// Immutable, validated job catalog.
///
/// Cloning is cheap; all clones share the same job list.
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    jobs: Arc<[Job]>,
}

impl JobRegistry {
    /// Validate and freeze a catalog.
    ///
    /// Fails on empty ids, zero timeouts and duplicate ids; registration order is kept.
    #[instrument(level = "debug", skip_all, fields(jobs = tracing::field::Empty))]
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Result<Self, CoreError> {
        let jobs: Vec<Job> = jobs.into_iter().collect();
        tracing::Span::current().record("jobs", jobs.len());

        let mut seen = HashSet::with_capacity(jobs.len());
        for job in &jobs {
            if job.id.is_empty() {
                return Err(CoreError::EmptyJobId);
            }
            if job.timeout_secs == 0 {
                return Err(CoreError::InvalidTimeout(job.id.clone()));
            }
            if !seen.insert(&job.id) {
                return Err(CoreError::DuplicateJob(job.id.clone()));
            }
        }

        debug!("job catalog validated");
        Ok(Self { jobs: jobs.into() })
    }

    /// Jobs in registration order.
    #[inline]
    pub fn list(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
