use std::{
    collections::HashMap,
    io::Write,
    sync::{Mutex, PoisonError},
};

use mdpipe_core::{JobEvent, JobEventKind, Subscribe};
use mdpipe_model::{Job, JobId, RecordStatus};

use crate::{table::truncate, writer::emit};

const REASON_CHARS: usize = 100;

/// Prints one console line per finished job, in completion order.
pub struct Progress {
    descriptions: HashMap<JobId, String>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Progress {
    pub fn stdout(jobs: &[Job]) -> Self {
        Self::with_writer(jobs, std::io::stdout())
    }

    pub fn with_writer(jobs: &[Job], out: impl Write + Send + 'static) -> Self {
        Self {
            descriptions: jobs
                .iter()
                .map(|j| (j.id.clone(), j.description.clone()))
                .collect(),
            out: Mutex::new(Box::new(out)),
        }
    }

    fn line(&self, event: &JobEvent) -> Option<String> {
        match event.kind {
            JobEventKind::BatchStarted => Some(format!(
                "\nExecuting {} job(s) in parallel (max workers: {})...\n",
                event.jobs.unwrap_or(0),
                event.workers.unwrap_or(0)
            )),
            JobEventKind::Finished => {
                let id = event.job.as_ref()?;
                let status = RecordStatus::from(event.status?);
                let secs = event.elapsed.unwrap_or_default().as_secs_f64();
                let description = self.descriptions.get(id).map(String::as_str).unwrap_or("");

                let mut line = format!("  [Job {id}] {} ({secs:.1}s) - {description}\n", status.label());
                if status != RecordStatus::Success {
                    if let Some(reason) = event.reason.as_deref() {
                        line.push_str(&format!("    Error: {}\n", truncate(reason, REASON_CHARS)));
                    }
                }
                Some(line)
            }
            _ => None,
        }
    }
}

impl Subscribe for Progress {
    fn on_event(&self, event: &JobEvent) {
        let Some(line) = self.line(event) else {
            return;
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        emit(&mut **out, &line);
    }

    fn name(&self) -> &'static str {
        "progress"
    }
}
