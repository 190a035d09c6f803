use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use mdpipe_core::{JobEvent, JobEventKind, Subscribe};
use mdpipe_model::JobId;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, proto::MetricFamily,
};

/// Analyses run from seconds to an hour.
const DURATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0,
];

#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    dispatched: IntCounter,
    started: IntCounter,
    completed: IntCounterVec,
    running: IntGauge,
    duration: Histogram,
    // Jobs cancelled before start finish without ever running.
    in_flight: Arc<Mutex<HashSet<JobId>>>,
}

impl PrometheusMetrics {
    /// Metrics registered in a fresh private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let dispatched = IntCounter::with_opts(Opts::new(
            "mdpipe_jobs_dispatched_total",
            "Jobs handed to the worker pool",
        ))?;
        let started = IntCounter::with_opts(Opts::new(
            "mdpipe_jobs_started_total",
            "Jobs that acquired a worker slot",
        ))?;
        let completed = IntCounterVec::new(
            Opts::new("mdpipe_jobs_completed_total", "Jobs that reached a terminal state"),
            &["status"],
        )?;
        let running = IntGauge::with_opts(Opts::new(
            "mdpipe_jobs_running",
            "Jobs currently holding a worker slot",
        ))?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("mdpipe_job_duration_seconds", "Wall-clock time of started jobs")
                .buckets(DURATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(dispatched.clone()))?;
        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(completed.clone()))?;
        registry.register(Box::new(running.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            dispatched,
            started,
            completed,
            running,
            duration,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<JobId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Subscribe for PrometheusMetrics {
    fn on_event(&self, event: &JobEvent) {
        match event.kind {
            JobEventKind::Dispatched => self.dispatched.inc(),
            JobEventKind::Started => {
                self.started.inc();
                let Some(job) = &event.job else { return };
                if self.in_flight().insert(job.clone()) {
                    self.running.inc();
                }
            }
            JobEventKind::Finished => {
                if let Some(status) = event.status {
                    self.completed.with_label_values(&[status.as_str()]).inc();
                }
                let Some(job) = &event.job else { return };
                if !self.in_flight().remove(job) {
                    return;
                }
                self.running.dec();
                if let Some(elapsed) = event.elapsed {
                    self.duration.observe(elapsed.as_secs_f64());
                }
            }
            JobEventKind::BatchStarted | JobEventKind::BatchFinished => {}
        }
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use mdpipe_model::{ExecutionResult, JobStatus, Outcome};

    use super::*;

    fn finished(id: &str, outcome: Outcome, started: bool) -> JobEvent {
        let mut r = ExecutionResult::pending(JobId::from(id));
        if started {
            r.begin(SystemTime::now()).unwrap();
        }
        r.finish(outcome).unwrap();
        JobEvent::finished(&r)
    }

    #[test]
    fn counts_job_lifecycle() {
        let m = PrometheusMetrics::new().unwrap();
        let a = JobId::from("a");

        m.on_event(&JobEvent::dispatched(&a));
        m.on_event(&JobEvent::started(&a, 60));
        assert_eq!(m.running.get(), 1);

        m.on_event(&finished("a", Outcome::timed_out(Duration::from_secs(2)), true));
        assert_eq!(m.running.get(), 0);
        assert_eq!(m.dispatched.get(), 1);
        assert_eq!(m.started.get(), 1);
        assert_eq!(m.completed.with_label_values(&["timed_out"]).get(), 1);
        assert_eq!(m.duration.get_sample_count(), 1);
        assert_eq!(m.duration.get_sample_sum(), 2.0);
    }

    #[test]
    fn unstarted_jobs_do_not_touch_running_gauge() {
        let m = PrometheusMetrics::new().unwrap();
        let b = JobId::from("b");

        m.on_event(&JobEvent::dispatched(&b));
        m.on_event(&finished(
            "b",
            Outcome::error(Duration::ZERO, "cancelled before start"),
            false,
        ));

        assert_eq!(m.running.get(), 0);
        assert_eq!(m.duration.get_sample_count(), 0);
        assert_eq!(
            m.completed
                .with_label_values(&[JobStatus::Error.as_str()])
                .get(),
            1
        );
    }

    #[test]
    fn text_exposition_names_every_metric() {
        let m = PrometheusMetrics::new().unwrap();
        m.on_event(&finished("c", Outcome::success(Duration::from_secs(1)), true));

        let text = m.encode_text().unwrap();
        for name in [
            "mdpipe_jobs_dispatched_total",
            "mdpipe_jobs_started_total",
            "mdpipe_jobs_completed_total{status=\"success\"}",
            "mdpipe_jobs_running",
            "mdpipe_job_duration_seconds_bucket",
        ] {
            assert!(text.contains(name), "missing {name} in:\n{text}");
        }
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Registry::new();
        assert!(PrometheusMetrics::with_registry(registry.clone()).is_ok());
        assert!(PrometheusMetrics::with_registry(registry).is_err());
    }
}
