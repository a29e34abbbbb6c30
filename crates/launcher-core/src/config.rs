//! Centralized configuration for crew-launcher.
//!
//! Compile-time constants are grouped in unit structs; the runtime layout
//! (directories, port, URL opener) lives in [`LauncherConfig`], which is
//! built from the environment with sensible defaults.

use crate::error::{LauncherError, Result};
use crate::profile::ProfileId;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "crew-launcher";
    /// Name of the launcher binary, used to recognise the daemon in the process table.
    pub const BINARY_NAME: &'static str = "crew-launcher";
    /// Subcommands whose process hosts the dispatch server.
    pub const DAEMON_SUBCOMMANDS: [&'static str; 3] = ["start", "start-server", "add"];
}

/// Shared directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const PROFILE_EXTENSION: &'static str = "json";
    pub const PID_FILE_NAME: &'static str = "daemon.pid";
    pub const DAEMON_LOG_NAME: &'static str = "daemon.log";
    pub const CMDLOG_DIR_NAME: &'static str = "cmdlog";
    pub const ASSET_DIR_NAME: &'static str = "pwa";
    pub const INSTALLER_PAGE: &'static str = "installer.html";
    pub const LAUNCHER_PAGE: &'static str = "app.html";
}

/// HTTP server settings.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 25500;
    /// Requests handled at the same time by either server.
    pub const MAX_IN_FLIGHT_REQUESTS: usize = 1;
    /// How long a response already being written may take once a server stops.
    pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
}

/// Daemon lifecycle settings.
pub struct DaemonConfig;

impl DaemonConfig {
    /// How long `stop` waits for the previous daemon to release its port.
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(3);
    pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);
}

/// Chromebrew install layout.
pub struct CrewConfig;

impl CrewConfig {
    pub const DEFAULT_PREFIX: &'static str = "/usr/local";
}

/// Default `OpenUrl` call on the Chromium URL handler service.
const DEFAULT_URL_OPENER: [&str; 8] = [
    "dbus-send",
    "--system",
    "--type=method_call",
    "--print-reply",
    "--dest=org.chromium.UrlHandlerService",
    "/org/chromium/UrlHandlerService",
    "org.chromium.UrlHandlerServiceInterface.OpenUrl",
    "string:{url}",
];

/// Placeholder substituted with the URL in opener arguments.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Runtime configuration: where things live and where servers listen.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Directory holding one `<id>.json` per profile.
    pub config_dir: PathBuf,
    /// Directory for the PID file, daemon log and per-launch logs.
    pub tmp_dir: PathBuf,
    /// Static install-flow assets (`installer.html`, `app.html`, ...).
    pub asset_dir: PathBuf,
    pub host: String,
    /// Dispatch server port.
    pub port: u16,
    /// Installer port; `None` shares the dispatch port so the manifest's
    /// `start_url` stays same-origin.
    pub installer_port: Option<u16>,
    /// Chromebrew prefix used for package file lists and icon themes.
    pub crew_prefix: PathBuf,
    /// Icon search roots, in priority order.
    pub icon_dirs: Vec<PathBuf>,
    /// Argument vector used to open a URL in the browser.
    pub url_opener: Vec<String>,
}

impl LauncherConfig {
    /// Build the configuration from `CREW_LAUNCHER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let config_dir = match env_path("CREW_LAUNCHER_CONFIG_DIR") {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or_else(|| LauncherError::Config {
                    message: "Could not determine config directory".to_string(),
                })?
                .join(AppConfig::APP_NAME),
        };

        let tmp_dir = env_path("CREW_LAUNCHER_TMP_DIR")
            .unwrap_or_else(|| std::env::temp_dir().join(AppConfig::APP_NAME));

        let asset_dir = env_path("CREW_LAUNCHER_ASSET_DIR").unwrap_or_else(default_asset_dir);

        let port = match std::env::var("CREW_LAUNCHER_PORT") {
            Ok(value) => parse_port("CREW_LAUNCHER_PORT", &value)?,
            Err(_) => ServerConfig::DEFAULT_PORT,
        };

        let installer_port = match std::env::var("CREW_LAUNCHER_INSTALLER_PORT") {
            Ok(value) => Some(parse_port("CREW_LAUNCHER_INSTALLER_PORT", &value)?),
            Err(_) => None,
        };

        let crew_prefix =
            env_path("CREW_PREFIX").unwrap_or_else(|| PathBuf::from(CrewConfig::DEFAULT_PREFIX));

        let url_opener = match std::env::var("CREW_LAUNCHER_URL_OPENER") {
            Ok(value) if !value.trim().is_empty() => parse_opener(&value),
            _ => DEFAULT_URL_OPENER.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            icon_dirs: default_icon_dirs(&crew_prefix),
            config_dir,
            tmp_dir,
            asset_dir,
            host: ServerConfig::DEFAULT_HOST.to_string(),
            port,
            installer_port,
            crew_prefix,
            url_opener,
        })
    }

    /// A self-contained layout below `root`, with OS-assigned ports.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let crew_prefix = root.join("prefix");
        Self {
            config_dir: root.join("config"),
            tmp_dir: root.join("tmp"),
            asset_dir: root.join(PathsConfig::ASSET_DIR_NAME),
            host: ServerConfig::DEFAULT_HOST.to_string(),
            port: 0,
            installer_port: Some(0),
            icon_dirs: vec![crew_prefix.join("share").join("icons")],
            crew_prefix,
            url_opener: Vec::new(),
        }
    }

    /// Create the config, tmp and cmdlog directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.tmp_dir, &self.cmdlog_dir()] {
            fs::create_dir_all(dir).map_err(|e| LauncherError::io_with_path(e, dir))?;
        }
        Ok(())
    }

    pub fn pid_file(&self) -> PathBuf {
        self.tmp_dir.join(PathsConfig::PID_FILE_NAME)
    }

    pub fn daemon_log(&self) -> PathBuf {
        self.tmp_dir.join(PathsConfig::DAEMON_LOG_NAME)
    }

    pub fn cmdlog_dir(&self) -> PathBuf {
        self.tmp_dir.join(PathsConfig::CMDLOG_DIR_NAME)
    }

    /// Output log of the command launched for `id`.
    pub fn command_log(&self, id: &ProfileId) -> PathBuf {
        self.cmdlog_dir().join(format!("{}.log", id))
    }

    pub fn effective_installer_port(&self) -> u16 {
        self.installer_port.unwrap_or(self.port)
    }

    /// Directory holding package file lists.
    pub fn package_meta_dir(&self) -> PathBuf {
        self.crew_prefix.join("etc").join("crew").join("meta")
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value.trim().parse().map_err(|_| LauncherError::Config {
        message: format!("{} must be a port number, got '{}'", key, value),
    })
}

/// Split an opener command line; the URL is appended when no placeholder is given.
fn parse_opener(value: &str) -> Vec<String> {
    let mut argv: Vec<String> = value.split_whitespace().map(String::from).collect();
    if !argv.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
        argv.push(URL_PLACEHOLDER.to_string());
    }
    argv
}

fn default_asset_dir() -> PathBuf {
    let mut candidates = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(PathsConfig::ASSET_DIR_NAME));
        candidates.push(
            exe_dir
                .join("..")
                .join("share")
                .join(AppConfig::APP_NAME)
                .join(PathsConfig::ASSET_DIR_NAME),
        );
    }

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(CrewConfig::DEFAULT_PREFIX).join("share"))
        .join(AppConfig::APP_NAME)
        .join(PathsConfig::ASSET_DIR_NAME);

    candidates
        .into_iter()
        .find(|dir| dir.is_dir())
        .unwrap_or(data_dir)
}

fn default_icon_dirs(crew_prefix: &Path) -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Some(data) = dirs::data_dir() {
        dirs_list.push(data.join("icons"));
    }
    dirs_list.push(crew_prefix.join("share").join("icons"));
    dirs_list.push(crew_prefix.join("share").join("pixmaps"));
    dirs_list.push(PathBuf::from("/usr/share/icons"));
    dirs_list.push(PathBuf::from("/usr/share/pixmaps"));
    dirs_list
}
