use std::time::Duration;

use tokio::process::Child;
use tracing::trace;

/// Terminate a child and every process in its group.
///
/// The child must have been spawned as a process-group leader
/// (`process_group(0)`). The group gets SIGTERM, then SIGKILL once `grace`
/// elapses or the leader exits, whichever comes first; the leader is reaped
/// before returning.
#[cfg(unix)]
pub async fn kill_tree(child: &mut Child, grace: Duration) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };
    let pgid = pid as libc::pid_t;

    signal_group(pgid, libc::SIGTERM);
    if !grace.is_zero() {
        if let Ok(waited) = tokio::time::timeout(grace, child.wait()).await {
            // Leader is gone; stragglers in the group still get SIGKILL.
            signal_group(pgid, libc::SIGKILL);
            return waited.map(|_| ());
        }
    }

    signal_group(pgid, libc::SIGKILL);
    let _ = child.start_kill();
    child.wait().await.map(|_| ())
}

/// SIGKILL whatever is left in the group led by `pid` after the leader exited.
///
/// Background descendants would otherwise keep the job's pipes open.
#[cfg(unix)]
pub fn kill_stragglers(pid: u32) {
    signal_group(pid as libc::pid_t, libc::SIGKILL);
}

#[cfg(not(unix))]
pub fn kill_stragglers(_pid: u32) {}

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) {
    // ESRCH just means the group is already empty.
    let rc = unsafe { libc::killpg(pgid, signal) };
    trace!(target: "mdpipe.exec.kill", pgid, signal, rc, "signal sent to process group");
}

#[cfg(not(unix))]
pub async fn kill_tree(child: &mut Child, _grace: Duration) -> std::io::Result<()> {
    trace!(target: "mdpipe.exec.kill", "killing child (no process groups on this platform)");
    child.kill().await
}
