use std::{
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use mdpipe_model::{ExecutionResult, Job, Outcome, Summary};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    aggregator::ResultAggregator,
    events::{JobEvent, Subscribe},
    executor::Executor,
    registry::JobRegistry,
};

/// Upper bound on concurrent jobs regardless of core count or configuration.
pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Optional cap below [`DEFAULT_MAX_WORKERS`].
    pub max_workers: Option<usize>,
}

impl PoolConfig {
    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = Some(n);
        self
    }

    /// `min(available cores, configured cap, DEFAULT_MAX_WORKERS)`, at least 1.
    pub fn workers(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        workers_for(cores, self.max_workers)
    }
}

fn workers_for(cores: usize, cap: Option<usize>) -> usize {
    cores
        .min(cap.unwrap_or(DEFAULT_MAX_WORKERS))
        .min(DEFAULT_MAX_WORKERS)
        .max(1)
}

/// Bounded worker pool that runs a whole catalog and waits for all of it.
pub struct Scheduler {
    executor: Arc<dyn Executor>,
    subscribers: Arc<[Arc<dyn Subscribe>]>,
    cancel: CancellationToken,
    workers: usize,
}

impl Scheduler {
    pub fn new(executor: Arc<dyn Executor>, cfg: PoolConfig) -> Self {
        Self {
            executor,
            subscribers: Vec::new().into(),
            cancel: CancellationToken::new(),
            workers: cfg.workers(),
        }
    }

    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers.into();
        self
    }

    /// Number of concurrent execution slots.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Token that tears the batch down: running jobs are killed, queued ones never start.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every job of `registry` exactly once and return after all are terminal.
    #[instrument(
        level = "info",
        skip_all,
        fields(jobs = registry.len(), workers = self.workers, executor = self.executor.name())
    )]
    pub async fn run_all(&self, registry: &JobRegistry) -> Summary {
        let jobs = registry.list();
        let aggregator = ResultAggregator::new();

        if jobs.is_empty() {
            debug!("empty catalog; nothing to run");
            return aggregator.finalize(jobs);
        }

        let started = Instant::now();
        publish(&self.subscribers, &JobEvent::batch_started(jobs.len(), self.workers));

        let slots = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();

        for job in jobs.iter().cloned() {
            aggregator.dispatch(&job);
            publish(&self.subscribers, &JobEvent::dispatched(&job.id));

            let worker = Worker {
                executor: Arc::clone(&self.executor),
                subscribers: Arc::clone(&self.subscribers),
                aggregator: aggregator.clone(),
                slots: Arc::clone(&slots),
                cancel: self.cancel.clone(),
            };
            set.spawn(worker.run(job));
        }

        // Barrier: join over all outstanding work.
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker terminated abnormally; its job is reported as not run");
            }
        }

        publish(
            &self.subscribers,
            &JobEvent::batch_finished(jobs.len(), started.elapsed()),
        );

        for job in jobs {
            if let Some(status) = aggregator.status_of(&job.id) {
                if !status.is_terminal() {
                    warn!(job = %job.id, %status, "job never settled; reported as not run");
                }
            }
        }

        let summary = aggregator.finalize(jobs);
        info!(
            successful = summary.success_count(),
            failed = summary.failed_count(),
            cpu_secs = aggregator.total_elapsed().as_secs_f64(),
            wall_secs = started.elapsed().as_secs_f64(),
            "batch finished"
        );
        summary
    }
}

struct Worker {
    executor: Arc<dyn Executor>,
    subscribers: Arc<[Arc<dyn Subscribe>]>,
    aggregator: ResultAggregator,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, job: Job) {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.settle_unstarted(&job, "cancelled before start");
                return;
            }
            permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    self.settle_unstarted(&job, "worker pool closed");
                    return;
                }
            },
        };

        if let Err(e) = self.aggregator.mark_running(&job.id, SystemTime::now()) {
            warn!(job = %job.id, error = %e, "could not mark job running");
        }
        publish(&self.subscribers, &JobEvent::started(&job.id, job.timeout_secs));

        let result = self.executor.execute(&job, self.cancel.child_token()).await;
        self.settle(result);

        drop(permit);
    }

    fn settle_unstarted(&self, job: &Job, reason: &str) {
        let mut result = ExecutionResult::pending(job.id.clone());
        if let Err(e) = result.finish(Outcome::error(Duration::ZERO, reason)) {
            warn!(job = %job.id, error = %e, "could not settle unstarted job");
        }
        self.settle(result);
    }

    fn settle(&self, result: ExecutionResult) {
        let event = JobEvent::finished(&result);
        let id = result.job_id.clone();
        if let Err(e) = self.aggregator.record(result) {
            warn!(job = %id, error = %e, "result rejected by aggregator");
        }
        publish(&self.subscribers, &event);
    }
}

fn publish(subscribers: &[Arc<dyn Subscribe>], event: &JobEvent) {
    for s in subscribers {
        s.on_event(event);
    }
}
