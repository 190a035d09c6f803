use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus, Summary};

/// Status label of the persisted summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "NOT RUN")]
    NotRun,
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Success => "SUCCESS",
            RecordStatus::Failed => "FAILED",
            RecordStatus::Timeout => "TIMEOUT",
            RecordStatus::Error => "ERROR",
            RecordStatus::NotRun => "NOT RUN",
        }
    }
}

impl From<JobStatus> for RecordStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Success => RecordStatus::Success,
            JobStatus::Failed => RecordStatus::Failed,
            JobStatus::TimedOut => RecordStatus::Timeout,
            JobStatus::Error => RecordStatus::Error,
            JobStatus::Pending | JobStatus::Running => RecordStatus::NotRun,
        }
    }
}

/// Persisted per-job entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub description: String,
    pub status: RecordStatus,
    pub time_seconds: f64,
    pub error: Option<String>,
}

/// Persisted batch summary; the only machine-readable output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// RFC 3339 timestamp of the moment the summary was built.
    pub timestamp: String,
    pub total_modules: usize,
    pub successful: usize,
    pub failed: usize,
    pub modules: BTreeMap<JobId, ModuleRecord>,
}

impl From<&Summary> for SummaryRecord {
    fn from(summary: &Summary) -> Self {
        let modules = summary
            .per_job()
            .iter()
            .map(|(id, report)| {
                let record = ModuleRecord {
                    description: report.description.clone(),
                    status: report.result.status.into(),
                    time_seconds: report.result.elapsed.as_secs_f64(),
                    error: report.result.error.clone(),
                };
                (id.clone(), record)
            })
            .collect();

        Self {
            timestamp: summary.timestamp_rfc3339(),
            total_modules: summary.total_jobs(),
            successful: summary.success_count(),
            failed: summary.failed_count(),
            modules,
        }
    }
}
