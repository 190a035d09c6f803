use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use mdpipe_core::{JobRegistry, PoolConfig, Scheduler, Subscribe};
use mdpipe_exec::{ExecConfig, ProcExecutor};
use mdpipe_model::{JobTarget, Summary};
use mdpipe_observe::Journal;
use mdpipe_prometheus::PrometheusMetrics;
use mdpipe_report::{Progress, ReportConfig, ReportWriter, render_banner};
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

use crate::{
    catalog::{Catalog, CatalogError},
    cli::Cli,
};

/// Everything a batch run needs, resolved from catalog and command line.
#[derive(Debug, Clone)]
pub struct Plan {
    pub catalog_path: PathBuf,
    pub registry: JobRegistry,
    pub pool: PoolConfig,
    pub exec: ExecConfig,
    pub report: ReportConfig,
    pub metrics_out: Option<PathBuf>,
}

impl Plan {
    pub fn from_cli(cli: &Cli) -> Result<Self, CatalogError> {
        let catalog = Catalog::load(&cli.catalog)?;
        Self::from_catalog(&catalog, &cli.catalog, cli)
    }

    /// Command-line values win over catalog values.
    pub fn from_catalog(catalog: &Catalog, path: &Path, cli: &Cli) -> Result<Self, CatalogError> {
        let registry = JobRegistry::new(catalog.jobs(&cli.selection())?)?;

        let pool = match cli.workers.or(catalog.max_workers) {
            Some(0) => return Err(CatalogError::ZeroWorkers),
            Some(n) => PoolConfig::default().with_max_workers(n),
            None => PoolConfig::default(),
        };

        let mut exec = catalog.exec_config();
        if let Some(n) = cli.excerpt_bytes {
            exec.excerpt_bytes = n;
        }

        let summary_path = if cli.no_summary {
            None
        } else {
            cli.summary.clone().or_else(|| catalog.summary_path())
        };

        Ok(Self {
            catalog_path: path.to_path_buf(),
            registry,
            pool,
            exec,
            report: ReportConfig {
                summary_path,
                ..Default::default()
            },
            metrics_out: cli.metrics_out.clone(),
        })
    }
}

/// Run every job of `plan`, print the report to `out` and persist the summary.
///
/// Per-job progress lines go to `progress` as jobs finish. Ctrl-C cancels the
/// batch; the summary of whatever ran is still published.
pub async fn execute<W>(plan: &Plan, progress: W, out: &mut dyn Write) -> anyhow::Result<Summary>
where
    W: Write + Send + 'static,
{
    let executor = Arc::new(ProcExecutor::new(plan.exec.clone()));
    let metrics = match plan.metrics_out {
        Some(_) => Some(PrometheusMetrics::new().context("cannot create metrics registry")?),
        None => None,
    };

    let mut subscribers: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(Journal::new()),
        Arc::new(Progress::with_writer(plan.registry.list(), progress)),
    ];
    if let Some(m) = &metrics {
        subscribers.push(Arc::new(m.clone()));
    }
    let scheduler = Scheduler::new(executor.clone(), plan.pool.clone()).with_subscribers(subscribers);

    write_banner(plan, scheduler.workers(), out);

    let cancel = scheduler.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(target: "mdpipe.runner", "interrupted; killing running jobs and skipping the rest");
            cancel.cancel();
        }
    });
    let summary = scheduler.run_all(&plan.registry).await;
    interrupt.abort();

    ReportWriter::new(plan.report.clone()).publish(&summary, out);

    if let (Some(m), Some(path)) = (&metrics, &plan.metrics_out) {
        write_metrics(m, path);
    }

    info!(
        target: "mdpipe.runner",
        total = summary.total_jobs(),
        successful = summary.success_count(),
        failed = summary.failed_count(),
        spawns = executor.spawn_attempts(),
        "batch complete"
    );
    Ok(summary)
}

/// One line per selected job: id, timeout, target, description.
pub fn list_jobs(plan: &Plan, out: &mut dyn Write) -> io::Result<()> {
    for job in plan.registry.list() {
        let target = match &job.target {
            JobTarget::Program { command, .. } => command.display().to_string(),
            JobTarget::Script {
                interpreter,
                script,
                ..
            } => format!("{interpreter} {}", script.display()),
        };
        let args = job.target.args().join(" ");
        writeln!(
            out,
            "{:<6} {:>6}s  {:<50} {}",
            job.id.as_str(),
            job.timeout_secs,
            format!("{target} {args}").trim_end(),
            job.description
        )?;
    }
    out.flush()
}

fn write_banner(plan: &Plan, workers: usize, out: &mut dyn Write) {
    let started = Summary::now()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());
    let banner = render_banner(
        "ANALYSIS BATCH EXECUTOR",
        &[
            ("Catalog", plan.catalog_path.display().to_string()),
            ("Base Directory", plan.exec.working_dir.display().to_string()),
            ("Jobs", plan.registry.len().to_string()),
            ("Max Workers", workers.to_string()),
            ("Start Time", started),
        ],
    );
    if let Err(e) = out.write_all(banner.as_bytes()) {
        warn!(target: "mdpipe.runner", error = %e, "console output failed");
    }
}

fn write_metrics(metrics: &PrometheusMetrics, path: &Path) {
    let written = metrics
        .encode_text()
        .map_err(|e| e.to_string())
        .and_then(|text| fs::write(path, text).map_err(|e| e.to_string()));
    match written {
        Ok(()) => info!(target: "mdpipe.runner", path = %path.display(), "metrics written"),
        Err(e) => error!(target: "mdpipe.runner", path = %path.display(), error = %e, "could not write metrics"),
    }
}
