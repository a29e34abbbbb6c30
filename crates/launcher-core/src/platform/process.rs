//! Platform-specific process management.
//!
//! Liveness checks and termination signals go through `nix`; process table
//! scans go through `sysinfo`.

use crate::error::{LauncherError, Result};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Outcome of asking a process to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal was delivered.
    Delivered,
    /// The process no longer exists.
    NoSuchProcess,
}

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, 0)`; EPERM still means "exists"
/// - **Other**: process table lookup
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid as NixPid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match kill(NixPid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        process_cmdline(pid).is_some()
    }
}

/// Ask a process to terminate gracefully (SIGTERM).
///
/// A process that no longer exists is reported, not treated as an error.
pub fn send_terminate(pid: u32) -> Result<SignalOutcome> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid as NixPid;

        let raw = i32::try_from(pid).map_err(|_| LauncherError::Daemon {
            message: format!("PID {} out of range", pid),
        })?;

        debug!("Sending SIGTERM to process {}", pid);
        match kill(NixPid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(SignalOutcome::Delivered),
            Err(Errno::ESRCH) => Ok(SignalOutcome::NoSuchProcess),
            Err(e) => Err(LauncherError::Daemon {
                message: format!("Failed to signal process {}: {}", pid, e),
            }),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(LauncherError::Unsupported("process signals".into()))
    }
}

fn process_table() -> System {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
    );
    system
}

fn joined_cmdline(process: &sysinfo::Process) -> String {
    process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Argument vector of a live process, if it exists.
pub fn process_cmdline(pid: u32) -> Option<Vec<String>> {
    let system = process_table();
    system.process(Pid::from_u32(pid)).map(|process| {
        process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    })
}

/// Scan the process table for processes whose argument vector satisfies `matches`.
///
/// Returns `(pid, cmdline)` pairs sorted by PID.
pub fn find_processes<F>(matches: F) -> Vec<(u32, String)>
where
    F: Fn(&[String]) -> bool,
{
    let system = process_table();

    let mut found: Vec<(u32, String)> = system
        .processes()
        .iter()
        .filter_map(|(pid, process)| {
            let argv: Vec<String> = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            matches(&argv).then(|| (pid.as_u32(), joined_cmdline(process)))
        })
        .collect();

    found.sort_by_key(|(pid, _)| *pid);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_self() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        assert!(!is_process_alive(4_000_000_000));
    }

    #[test]
    fn test_own_cmdline_visible() {
        let argv = process_cmdline(std::process::id()).unwrap();
        assert!(!argv.is_empty());
    }

    #[test]
    fn test_find_processes_includes_self() {
        let own = std::process::id();
        let exe = std::env::args().next().unwrap();
        let found = find_processes(|argv| argv.first() == Some(&exe));
        assert!(found.iter().any(|(pid, _)| *pid == own));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_nonexistent() {
        // i32::MAX is above any configurable pid_max
        let outcome = send_terminate(i32::MAX as u32).unwrap();
        assert_eq!(outcome, SignalOutcome::NoSuchProcess);
    }
}
