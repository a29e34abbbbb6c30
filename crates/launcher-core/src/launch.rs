//! Launching profile commands.
//!
//! Commands are started detached and forgotten: output goes to a log file,
//! the child gets its own process group, and nobody waits on it. Exit
//! status is never observed.

use crate::error::{LauncherError, Result};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Shell used to interpret desktop-entry command lines.
const SHELL: &str = "/bin/sh";

/// Starts a command line with its output captured to a log file.
pub trait CommandSpawner: Send + Sync {
    /// Start `command_line` and return the child's PID without waiting for it.
    fn spawn(&self, command_line: &str, log_path: &Path) -> Result<u32>;
}

/// Spawns through `/bin/sh -c` and detaches the child.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSpawner;

impl CommandSpawner for DetachedSpawner {
    fn spawn(&self, command_line: &str, log_path: &Path) -> Result<u32> {
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io_with_path(e, parent))?;
        }

        // Truncate: each launch starts a fresh log.
        let log = File::create(log_path).map_err(|e| LauncherError::io_with_path(e, log_path))?;
        let log_err = log
            .try_clone()
            .map_err(|e| LauncherError::io_with_path(e, log_path))?;

        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        // Own process group, so terminal signals aimed at the daemon miss it.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| LauncherError::SpawnFailed {
            command: command_line.to_string(),
            message: e.to_string(),
        })?;

        let pid = child.id();
        info!("Launched '{}' as PID {}", command_line, pid);
        debug!("Output: {}", log_path.display());

        // Dropping `Child` neither waits nor kills.
        drop(child);
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_for_content(path: &Path, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if fs::read_to_string(path).map(|c| c.contains(needle)).unwrap_or(false) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_captures_output() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("cmdlog").join("app.log");

        let pid = DetachedSpawner.spawn("echo out; echo err 1>&2", &log).unwrap();
        assert!(pid > 0);
        assert!(wait_for_content(&log, "out"));
        assert!(wait_for_content(&log, "err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_truncates_log() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");
        fs::write(&log, "stale output from last launch").unwrap();

        DetachedSpawner.spawn("echo fresh", &log).unwrap();
        assert!(wait_for_content(&log, "fresh"));
        assert!(!fs::read_to_string(&log).unwrap().contains("stale"));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_does_not_wait() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("app.log");

        let started = Instant::now();
        DetachedSpawner.spawn("sleep 5", &log).unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
