use std::{io::Write, path::PathBuf};

use mdpipe_model::{Summary, SummaryRecord};
use tracing::{error, info, warn};

use crate::{
    persist::persist,
    table::{render_footer, render_table},
};

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Where the JSON summary goes; `None` skips persistence.
    pub summary_path: Option<PathBuf>,
    /// Append the success/failure verdict after the table.
    pub with_footer: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_path: None,
            with_footer: true,
        }
    }
}

/// Console table and persisted record for `summary`. Pure.
pub fn render(summary: &Summary) -> (String, SummaryRecord) {
    (render_table(summary), SummaryRecord::from(summary))
}

pub struct ReportWriter {
    cfg: ReportConfig,
}

impl ReportWriter {
    pub fn new(cfg: ReportConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.cfg
    }

    /// Print the report to `out` and persist the summary if configured.
    ///
    /// Failures are logged and reported on `out`, never returned. Returns the
    /// path of the persisted summary on success.
    pub fn publish(&self, summary: &Summary, out: &mut dyn Write) -> Option<PathBuf> {
        let (table, record) = render(summary);
        emit(out, &table);

        let persisted = self.cfg.summary_path.as_ref().and_then(|path| {
            match persist(&record, path) {
                Ok(()) => {
                    info!(target: "mdpipe.report", path = %path.display(), "summary saved");
                    emit(out, &format!("\n✓ Results saved to: {}\n", path.display()));
                    Some(path.clone())
                }
                Err(e) => {
                    error!(target: "mdpipe.report", path = %path.display(), error = %e, "could not save summary");
                    emit(out, &format!("\n✗ Could not save results: {e}\n"));
                    None
                }
            }
        });

        if self.cfg.with_footer {
            emit(out, &render_footer(summary));
        }
        persisted
    }
}

pub(crate) fn emit(out: &mut dyn Write, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        warn!(target: "mdpipe.report", error = %e, "report output failed");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        time::{Duration, SystemTime},
    };

    use mdpipe_model::{ExecutionResult, JobId, JobReport, Outcome};
    use time::OffsetDateTime;

    use super::*;

    fn summary() -> Summary {
        let mut r = ExecutionResult::pending(JobId::from("a"));
        r.begin(SystemTime::now()).unwrap();
        r.finish(Outcome::failed(Duration::from_secs(1), Some(1), "ValueError: bad"))
            .unwrap();
        Summary::new(
            OffsetDateTime::UNIX_EPOCH,
            [JobReport {
                description: "RDF".into(),
                result: r,
            }],
        )
    }

    #[test]
    fn render_is_consistent() {
        let (table, record) = render(&summary());
        assert!(table.contains("✗ FAILED"));
        assert_eq!(record.total_modules, 1);
        assert_eq!(record.failed, 1);
        assert_eq!(record.timestamp, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn publish_writes_table_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/summary.json");
        let writer = ReportWriter::new(ReportConfig {
            summary_path: Some(path.clone()),
            ..Default::default()
        });

        let mut out = Vec::new();
        let saved = writer.publish(&summary(), &mut out);

        assert_eq!(saved.as_deref(), Some(path.as_path()));
        assert!(path.is_file());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("EXECUTION SUMMARY"));
        assert!(text.contains("Results saved to"));
        assert!(text.contains("BATCH COMPLETED WITH 1 FAILURE(S)"));
    }

    #[test]
    fn publish_survives_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let writer = ReportWriter::new(ReportConfig {
            summary_path: Some(blocker.join("summary.json")),
            with_footer: false,
        });

        let mut out = Vec::new();
        assert!(writer.publish(&summary(), &mut out).is_none());

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("EXECUTION SUMMARY"));
        assert!(text.contains("Could not save results"));
        assert!(!text.contains("FAILURE(S)"));
    }

    #[test]
    fn no_path_means_no_file() {
        let writer = ReportWriter::new(ReportConfig::default());
        let mut out = Vec::new();
        assert!(writer.publish(&summary(), &mut out).is_none());
    }
}
