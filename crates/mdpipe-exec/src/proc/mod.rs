//! Process-backed [`Executor`].
//!
//! Each job runs as its own child process (its own process group on Unix).
//! Stdout is drained to trace logs, stderr is kept as a bounded tail that
//! becomes the error excerpt of a failed job. A job that outlives its timeout
//! or is cancelled has its whole process group killed before the result is
//! returned. When the leader exits on its own, whatever is left in its group
//! is killed too, so no descendant outlives the job.
use std::{
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime},
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use mdpipe_core::Executor;
use mdpipe_model::{DEFAULT_EXCERPT_BYTES, ExecutionResult, Job, JobId, Outcome};

use crate::{
    error::ExecError,
    utils::{
        kill::{kill_stragglers, kill_tree},
        limits::{RlimitConfig, attach_rlimits},
        tail::{SharedTail, read_tail},
    },
};

mod resolve;
pub use resolve::{Invocation, resolve};

/// How long pipe readers may lag behind process exit before being abandoned.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Settings shared by every job the executor runs.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Working directory of job processes; relative targets resolve against it.
    pub working_dir: PathBuf,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
    /// Size of the stderr tail kept as error excerpt.
    pub excerpt_bytes: usize,
    /// SIGTERM → SIGKILL delay when a job is killed.
    pub kill_grace: Duration,
    pub rlimits: RlimitConfig,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            env: Vec::new(),
            excerpt_bytes: DEFAULT_EXCERPT_BYTES,
            kill_grace: Duration::from_secs(5),
            rlimits: RlimitConfig::default(),
        }
    }
}

/// Runs jobs as child processes.
pub struct ProcExecutor {
    cfg: ExecConfig,
    spawns: AtomicU64,
}

impl ProcExecutor {
    pub fn new(cfg: ExecConfig) -> Self {
        Self {
            cfg,
            spawns: AtomicU64::new(0),
        }
    }

    /// Number of spawn attempts so far, successful or not.
    pub fn spawn_attempts(&self) -> u64 {
        self.spawns.load(Ordering::Relaxed)
    }

    fn command(&self, inv: &Invocation) -> Command {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .current_dir(&self.cfg.working_dir)
            .envs(self.cfg.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        attach_rlimits(&mut cmd, &self.cfg.rlimits);
        cmd
    }

    async fn run(&self, job: &Job, cancel: &CancellationToken) -> Outcome {
        let inv = match resolve(&job.target, &self.cfg.working_dir) {
            Ok(inv) => inv,
            Err(e) => {
                warn!(target: "mdpipe.exec.proc", job = %job.id, error = %e, "job target is not runnable");
                return Outcome::error(Duration::ZERO, e.to_string());
            }
        };
        if cancel.is_cancelled() {
            return Outcome::error(Duration::ZERO, ExecError::Cancelled.to_string());
        }

        trace!(
            target: "mdpipe.exec.proc",
            job = %job.id,
            kind = job.target.kind(),
            program = %inv.program.display(),
            args = ?inv.args,
            "spawn"
        );
        self.spawns.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let mut child = match self.command(&inv).spawn() {
            Ok(child) => child,
            Err(e) => {
                let e = ExecError::Spawn(e);
                warn!(target: "mdpipe.exec.proc", job = %job.id, error = %e, "spawn failed");
                return Outcome::error(started.elapsed(), e.to_string());
            }
        };

        // Group id of the job; the leader's pid, valid until it is reaped.
        let pgid = child.id();
        let tail = SharedTail::new(self.cfg.excerpt_bytes);
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_tail(err, tail.clone())));
        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(drain_lines(job.id.clone(), out)));

        let timeout = job.timeout();
        tokio::select! {
            status = child.wait() => {
                let elapsed = started.elapsed();
                if let Some(pgid) = pgid {
                    kill_stragglers(pgid);
                }
                tokio::join!(join_reader(stderr), join_reader(stdout));
                let excerpt = excerpt(&job.id, &tail);
                match status {
                    Ok(status) => classify(status, elapsed, excerpt),
                    Err(e) => Outcome::error(elapsed, ExecError::Wait(e).to_string()),
                }
            }
            _ = tokio::time::sleep(timeout) => {
                debug!(target: "mdpipe.exec.proc", job = %job.id, timeout_secs = timeout.as_secs(), "timeout; killing process group");
                self.kill(&job.id, &mut child).await;
                tokio::join!(join_reader(stderr), join_reader(stdout));
                Outcome::timed_out(timeout)
            }
            _ = cancel.cancelled() => {
                debug!(target: "mdpipe.exec.proc", job = %job.id, "cancelled; killing process group");
                self.kill(&job.id, &mut child).await;
                tokio::join!(join_reader(stderr), join_reader(stdout));
                Outcome::error(started.elapsed(), ExecError::Cancelled.to_string())
            }
        }
    }

    async fn kill(&self, job: &JobId, child: &mut Child) {
        if let Err(e) = kill_tree(child, self.cfg.kill_grace).await {
            warn!(target: "mdpipe.exec.kill", %job, error = %e, "failed to reap killed job");
        }
    }
}

#[async_trait]
impl Executor for ProcExecutor {
    fn name(&self) -> &'static str {
        "proc"
    }

    async fn execute(&self, job: &Job, cancel: CancellationToken) -> ExecutionResult {
        let mut result = ExecutionResult::pending(job.id.clone());
        if let Err(e) = result.begin(SystemTime::now()) {
            warn!(target: "mdpipe.exec.proc", error = %e, "result transition rejected");
        }

        let outcome = self.run(job, &cancel).await;
        debug!(
            target: "mdpipe.exec.proc",
            job = %job.id,
            status = %outcome.status,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            exit_code = ?outcome.exit_code,
            "job process settled"
        );
        if let Err(e) = result.finish(outcome) {
            warn!(target: "mdpipe.exec.proc", error = %e, "result transition rejected");
        }
        result
    }
}

fn classify(status: ExitStatus, elapsed: Duration, excerpt: String) -> Outcome {
    if status.success() {
        return Outcome::success(elapsed);
    }
    if let Some(code) = status.code() {
        let error = if excerpt.is_empty() {
            format!("exit code {code} with no error output")
        } else {
            excerpt
        };
        return Outcome::failed(elapsed, Some(code), error);
    }

    let headline = signal_description(status);
    let error = if excerpt.is_empty() {
        headline
    } else {
        format!("{headline}\n{excerpt}")
    };
    Outcome::failed(elapsed, None, error)
}

#[cfg(unix)]
fn signal_description(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(sig) => match signal_name(sig) {
            Some(name) => format!("terminated by signal {sig} ({name})"),
            None => format!("terminated by signal {sig}"),
        },
        None => "terminated abnormally".to_owned(),
    }
}

#[cfg(not(unix))]
fn signal_description(_status: ExitStatus) -> String {
    "terminated abnormally".to_owned()
}

#[cfg(unix)]
fn signal_name(sig: i32) -> Option<&'static str> {
    Some(match sig {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGILL => "SIGILL",
        libc::SIGABRT => "SIGABRT",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGTERM => "SIGTERM",
        libc::SIGBUS => "SIGBUS",
        libc::SIGXCPU => "SIGXCPU",
        libc::SIGXFSZ => "SIGXFSZ",
        _ => return None,
    })
}

async fn drain_lines<R>(job: JobId, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => trace!(target: "mdpipe.exec.stdout", %job, %line),
            Ok(None) => break,
            Err(e) => {
                // Non-UTF-8 output ends line logging, not the job.
                trace!(target: "mdpipe.exec.stdout", %job, error = %e, "stdout no longer readable");
                break;
            }
        }
    }
}

/// Wait for a pipe reader, abandoning it after [`READER_GRACE`].
///
/// A descendant that left the process group may still hold the pipe open;
/// whatever the reader collected so far is kept.
async fn join_reader<T>(handle: Option<JoinHandle<T>>) {
    let Some(mut handle) = handle else {
        return;
    };
    match tokio::time::timeout(READER_GRACE, &mut handle).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!(target: "mdpipe.exec.proc", error = %e, "pipe reader task failed"),
        Err(_) => {
            debug!(target: "mdpipe.exec.proc", "pipe still open after exit; reader abandoned");
            handle.abort();
        }
    }
}

fn excerpt(job: &JobId, tail: &SharedTail) -> String {
    let tail = tail.take();
    if tail.is_truncated() {
        trace!(target: "mdpipe.exec.proc", %job, stderr_bytes = tail.seen(), "stderr excerpt truncated");
    }
    tail.into_string().trim().to_owned()
}
