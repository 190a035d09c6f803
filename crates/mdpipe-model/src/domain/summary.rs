use std::{collections::BTreeMap, time::Duration};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{ExecutionResult, JobId};

/// Per-job line of a [`Summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub description: String,
    pub result: ExecutionResult,
}

/// Final, immutable view of one batch run.
///
/// Built once after every job reached a terminal state. Jobs that somehow never
/// did (a panicked worker) are kept with their last status and counted as failed,
/// so `success_count + failed_count == total_jobs` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    timestamp: OffsetDateTime,
    success_count: usize,
    failed_count: usize,
    per_job: BTreeMap<JobId, JobReport>,
}

impl Summary {
    pub fn new(timestamp: OffsetDateTime, reports: impl IntoIterator<Item = JobReport>) -> Self {
        let per_job: BTreeMap<JobId, JobReport> = reports
            .into_iter()
            .map(|r| (r.result.job_id.clone(), r))
            .collect();

        let success_count = per_job
            .values()
            .filter(|r| r.result.status.is_success())
            .count();
        let failed_count = per_job.len() - success_count;

        Self {
            timestamp,
            success_count,
            failed_count,
            per_job,
        }
    }

    /// Local wall-clock time, falling back to UTC when the offset is unknown.
    pub fn now() -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string())
    }

    pub fn total_jobs(&self) -> usize {
        self.per_job.len()
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn per_job(&self) -> &BTreeMap<JobId, JobReport> {
        &self.per_job
    }

    pub fn get(&self, id: &JobId) -> Option<&JobReport> {
        self.per_job.get(id)
    }

    /// Sum of each job's own duration. Workers overlap, so this exceeds wall time.
    pub fn total_elapsed(&self) -> Duration {
        self.per_job.values().map(|r| r.result.elapsed).sum()
    }

    /// Percentage of successful jobs; `0.0` for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.per_job.is_empty() {
            return 0.0;
        }
        self.success_count as f64 / self.per_job.len() as f64 * 100.0
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::Outcome;

    fn report(id: &str, outcome: Outcome) -> JobReport {
        let mut result = ExecutionResult::pending(JobId::from(id));
        result.begin(SystemTime::now()).unwrap();
        result.finish(outcome).unwrap();
        JobReport {
            description: format!("job {id}"),
            result,
        }
    }

    #[test]
    fn counts_add_up_to_total() {
        let summary = Summary::new(
            Summary::now(),
            vec![
                report("1", Outcome::success(Duration::from_secs(1))),
                report("2", Outcome::failed(Duration::from_secs(1), Some(2), "x")),
                report("3", Outcome::timed_out(Duration::from_secs(2))),
            ],
        );

        assert_eq!(summary.total_jobs(), 3);
        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failed_count(), 2);
        assert_eq!(summary.total_elapsed(), Duration::from_secs(4));
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn non_terminal_leftovers_count_as_failed() {
        let leftover = JobReport {
            description: "never ran".into(),
            result: ExecutionResult::pending(JobId::from("9")),
        };
        let summary = Summary::new(Summary::now(), vec![leftover]);
        assert_eq!(summary.success_count(), 0);
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn empty_summary() {
        let summary = Summary::new(Summary::now(), Vec::new());
        assert_eq!(summary.total_jobs(), 0);
        assert_eq!(summary.success_count() + summary.failed_count(), 0);
        assert_eq!(summary.success_rate(), 0.0);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn per_job_is_sorted_by_numeric_id() {
        let summary = Summary::new(
            Summary::now(),
            vec![
                report("10", Outcome::success(Duration::ZERO)),
                report("2", Outcome::success(Duration::ZERO)),
            ],
        );
        let ids: Vec<&str> = summary.per_job().keys().map(JobId::as_str).collect();
        assert_eq!(ids, vec!["2", "10"]);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let summary = Summary::new(OffsetDateTime::UNIX_EPOCH, Vec::new());
        assert_eq!(summary.timestamp_rfc3339(), "1970-01-01T00:00:00Z");
    }
}
