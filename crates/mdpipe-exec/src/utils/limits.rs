//! POSIX rlimits for analysis job processes.
//!
//! Trajectory and image analyses can run away with memory or write huge
//! intermediate files. [`RlimitConfig`] caps those per job process:
//! - on Unix the limits are installed in a `pre_exec` hook, i.e. in the child
//!   after `fork()` and before `execve()`, so the job never runs unrestricted;
//! - elsewhere a non-empty config only produces a warning.
use tokio::process::Command;

/// Per-process resource limits. `None` leaves the inherited limit unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// Maximum number of open file descriptors (`RLIMIT_NOFILE`).
    pub max_open_files: Option<u64>,

    /// Maximum size of any file the job creates, in bytes (`RLIMIT_FSIZE`).
    ///
    /// Exceeding it delivers `SIGXFSZ`, which shows up as a signal failure.
    pub max_file_size_bytes: Option<u64>,

    /// Maximum virtual address space, in bytes (`RLIMIT_AS`).
    ///
    /// Allocation beyond it fails inside the job instead of waking the OOM killer.
    pub max_address_space_bytes: Option<u64>,

    /// Maximum CPU time in seconds (`RLIMIT_CPU`).
    pub max_cpu_secs: Option<u64>,

    /// Disable core dumps (`RLIMIT_CORE = 0`).
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    /// Returns `true` if no explicit limits are configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_open_files.is_none()
            && self.max_file_size_bytes.is_none()
            && self.max_address_space_bytes.is_none()
            && self.max_cpu_secs.is_none()
            && !self.disable_core_dumps
    }
}

/// Install `config` on `cmd`; a no-op for an empty config.
pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, config.clone());
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        tracing::warn!(
            target: "mdpipe.exec.limits",
            ?config,
            "rlimits are not supported on this platform; ignoring"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub fn attach_rlimits(cmd: &mut Command, config: RlimitConfig) {
        // SAFETY: the hook only calls `setrlimit`, which is async-signal-safe.
        unsafe {
            cmd.pre_exec(move || {
                let set = |resource, value: u64| -> io::Result<()> {
                    let rlim = libc::rlimit {
                        rlim_cur: value as libc::rlim_t,
                        rlim_max: value as libc::rlim_t,
                    };
                    if libc::setrlimit(resource, &rlim) != 0 {
                        return Err(io::Error::last_os_error());
                    }
                    Ok(())
                };

                let limits = [
                    (libc::RLIMIT_NOFILE, config.max_open_files),
                    (libc::RLIMIT_FSIZE, config.max_file_size_bytes),
                    (libc::RLIMIT_AS, config.max_address_space_bytes),
                    (libc::RLIMIT_CPU, config.max_cpu_secs),
                ];
                for (resource, value) in limits {
                    if let Some(value) = value {
                        set(resource, value)?;
                    }
                }
                if config.disable_core_dumps {
                    set(libc::RLIMIT_CORE, 0)?;
                }
                Ok(())
            });
        }
    }
}
