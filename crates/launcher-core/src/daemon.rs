//! Dispatch daemon lifecycle.
//!
//! The daemon is a detached copy of the launcher process hosting the
//! dispatch server. Its only shared state is the PID file; there is no lock,
//! so starting always stops the previous daemon first and two concurrent
//! starts can still race.
//!
//! ```text
//! NotRunning -> Starting -> Running -> (SIGTERM / HTTP stop) -> Stopped
//! ```

use crate::config::{AppConfig, DaemonConfig, LauncherConfig};
use crate::error::{LauncherError, Result};
use crate::platform::{self, SignalOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of [`DaemonHandle::stop_existing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A running daemon was signalled and has exited.
    Stopped(u32),
    /// The daemon was signalled but was still alive when the wait ran out.
    Signalled(u32),
    /// The PID file pointed at a process that is gone (or is not a daemon).
    AlreadyStopped(u32),
    /// No PID file.
    NotRunning,
}

/// How a running daemon was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    PidFile,
    ProcessScan,
}

/// Result of [`DaemonHandle::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonStatus {
    pub pid: Option<u32>,
    pub source: Option<DetectionSource>,
    pub cmdline: Option<String>,
}

impl DaemonStatus {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }

    fn not_running() -> Self {
        Self {
            pid: None,
            source: None,
            cmdline: None,
        }
    }
}

/// File-backed handle on the dispatch daemon.
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    pid_file: PathBuf,
    log_file: PathBuf,
}

impl DaemonHandle {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            pid_file: config.pid_file(),
            log_file: config.daemon_log(),
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// PID recorded in the PID file, if the file exists and parses.
    pub fn recorded_pid(&self) -> Option<u32> {
        let content = fs::read_to_string(&self.pid_file).ok()?;
        match content.trim().parse() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!("Invalid PID in {}: {}", self.pid_file.display(), e);
                None
            }
        }
    }

    /// Persist `pid` as the current daemon.
    pub fn record_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io_with_path(e, parent))?;
        }
        fs::write(&self.pid_file, pid.to_string())
            .map_err(|e| LauncherError::io_with_path(e, &self.pid_file))
    }

    /// Remove the PID file if it still names this process.
    pub fn release(&self) {
        if self.recorded_pid() == Some(std::process::id()) {
            if let Err(e) = fs::remove_file(&self.pid_file) {
                warn!("Failed to remove {}: {}", self.pid_file.display(), e);
            }
        }
    }

    /// Stop the daemon named by the PID file, if any.
    ///
    /// Safe to call at any time: a missing file, a dead process or a PID that
    /// was recycled by an unrelated program all count as already stopped.
    pub fn stop_existing(&self) -> Result<StopOutcome> {
        let Some(pid) = self.recorded_pid() else {
            return Ok(StopOutcome::NotRunning);
        };

        if pid == std::process::id() {
            return Ok(StopOutcome::NotRunning);
        }

        let is_daemon = platform::process_cmdline(pid)
            .map(|argv| is_daemon_cmdline(&argv))
            .unwrap_or(false);
        if !is_daemon {
            debug!("Stale PID file {}: {} is not a daemon", self.pid_file.display(), pid);
            self.remove_stale_pid_file();
            return Ok(StopOutcome::AlreadyStopped(pid));
        }

        if platform::send_terminate(pid)? == SignalOutcome::NoSuchProcess {
            self.remove_stale_pid_file();
            return Ok(StopOutcome::AlreadyStopped(pid));
        }

        let deadline = Instant::now() + DaemonConfig::STOP_TIMEOUT;
        while Instant::now() < deadline {
            if !platform::is_process_alive(pid) {
                info!("Stopped daemon PID {}", pid);
                return Ok(StopOutcome::Stopped(pid));
            }
            sleep(DaemonConfig::STOP_POLL_INTERVAL);
        }

        warn!("Daemon PID {} still running after SIGTERM", pid);
        Ok(StopOutcome::Signalled(pid))
    }

    fn remove_stale_pid_file(&self) {
        if let Err(e) = fs::remove_file(&self.pid_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.pid_file.display(), e);
            }
        }
    }

    /// Detach into the background and record the new PID.
    ///
    /// Forks, starts a new session, changes to `/`, and redirects stdout and
    /// stderr to the daemon log (truncated). Only the detached child returns.
    /// Must be called before any async runtime is started. Only the calling
    /// thread survives the fork, so threads started earlier (such as the
    /// reaper of a URL opener) are gone in the daemon.
    #[cfg(unix)]
    pub fn daemonize(&self) -> Result<u32> {
        use daemonize::Daemonize;

        if let Some(parent) = self.log_file.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io_with_path(e, parent))?;
        }
        let stdout = fs::File::create(&self.log_file)
            .map_err(|e| LauncherError::io_with_path(e, &self.log_file))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| LauncherError::io_with_path(e, &self.log_file))?;

        // The PID file is written below rather than by `daemonize`, which
        // would also lock it.
        Daemonize::new()
            .working_directory("/")
            .stdout(stdout)
            .stderr(stderr)
            .start()
            .map_err(|e| LauncherError::Daemon {
                message: format!("Failed to daemonize: {}", e),
            })?;

        let pid = std::process::id();
        self.record_pid(pid)?;
        info!("{} server daemon running with PID {}", AppConfig::APP_NAME, pid);
        Ok(pid)
    }

    #[cfg(not(unix))]
    pub fn daemonize(&self) -> Result<u32> {
        Err(LauncherError::Unsupported("daemonizing".into()))
    }

    /// Find the running daemon.
    ///
    /// The PID file is only a hint: its PID must be alive and look like a
    /// daemon. Otherwise the process table is scanned for the daemon's
    /// invocation signature.
    pub fn status(&self) -> DaemonStatus {
        let own = std::process::id();

        if let Some(pid) = self.recorded_pid().filter(|pid| *pid != own) {
            let argv = platform::process_cmdline(pid).filter(|argv| is_daemon_cmdline(argv));
            if let Some(argv) = argv {
                return DaemonStatus {
                    pid: Some(pid),
                    source: Some(DetectionSource::PidFile),
                    cmdline: Some(argv.join(" ")),
                };
            }
            debug!("Ignoring stale PID file entry {}", pid);
        }

        let found = platform::find_processes(is_daemon_cmdline)
            .into_iter()
            .find(|(pid, _)| *pid != own);

        match found {
            Some((pid, cmdline)) => DaemonStatus {
                pid: Some(pid),
                source: Some(DetectionSource::ProcessScan),
                cmdline: Some(cmdline),
            },
            None => DaemonStatus::not_running(),
        }
    }
}

/// Whether an argument vector is the launcher invoked as a daemon.
pub fn is_daemon_cmdline(argv: &[String]) -> bool {
    let Some((program, args)) = argv.split_first() else {
        return false;
    };

    let is_launcher = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        == Some(AppConfig::BINARY_NAME);

    is_launcher
        && args
            .iter()
            .find(|arg| !arg.starts_with('-'))
            .is_some_and(|sub| AppConfig::DAEMON_SUBCOMMANDS.contains(&sub.as_str()))
}
