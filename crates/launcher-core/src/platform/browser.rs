//! Opening URLs in the user's browser.

use crate::config::URL_PLACEHOLDER;
use crate::error::{LauncherError, Result};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Build the opener argument vector for `url`.
pub fn opener_argv(template: &[String], url: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(URL_PLACEHOLDER, url))
        .collect()
}

/// Ask the system to open `url`, without waiting for the opener.
///
/// The opener runs on a background thread that reaps it and logs a failed
/// exit status. Only failure to start the opener is returned.
pub fn open_url(template: &[String], url: &str) -> Result<()> {
    let argv = opener_argv(template, url);
    let (program, args) = argv.split_first().ok_or_else(|| LauncherError::Config {
        message: "no URL opener configured".to_string(),
    })?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|e| LauncherError::SpawnFailed {
            command: program.clone(),
            message: e.to_string(),
        })?;

    debug!("Opening {} with {}", url, program);
    let program = program.clone();
    thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("{} exited with {}", program, status),
        Err(e) => warn!("Failed to wait for {}: {}", program, e),
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opener_argv_substitutes_url() {
        let template = vec!["dbus-send".to_string(), "string:{url}".to_string()];
        assert_eq!(
            opener_argv(&template, "http://localhost:1/x"),
            vec!["dbus-send", "string:http://localhost:1/x"]
        );
    }

    #[test]
    fn test_open_url_without_opener() {
        assert!(matches!(
            open_url(&[], "http://localhost"),
            Err(LauncherError::Config { .. })
        ));
    }

    #[test]
    fn test_open_url_missing_program() {
        let template = vec!["/nonexistent/opener".to_string(), "{url}".to_string()];
        assert!(matches!(
            open_url(&template, "http://localhost"),
            Err(LauncherError::SpawnFailed { .. })
        ));
    }
}
