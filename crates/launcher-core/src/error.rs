//! Error types for crew-launcher.
//!
//! A single error enum covers the profile store, the desktop-entry and icon
//! collaborators, the daemon controller and command launching. The servers
//! map these onto HTTP status codes; the CLI prints them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crew-launcher.
#[derive(Debug, Error)]
pub enum LauncherError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("No such file or directory -- '{}'", .0.display())]
    NotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Profile errors
    #[error("{id}: Profile not found!")]
    ProfileNotFound { id: String },

    #[error("{id}: No shortcut named '{name}'")]
    ShortcutNotFound { id: String, name: String },

    #[error("Invalid profile identifier: {0}")]
    InvalidProfileId(String),

    // Collaborator errors
    #[error("Invalid desktop entry {}: {message}", path.display())]
    DesktopEntry { path: PathBuf, message: String },

    #[error("Cannot find a desktop entry for package '{package}'")]
    PackageNotFound { package: String },

    #[error("Cannot find an icon named '{name}'")]
    IconNotFound { name: String },

    // Process errors
    #[error("Failed to launch '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Daemon error: {message}")]
    Daemon { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for crew-launcher operations.
pub type Result<T> = std::result::Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        LauncherError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LauncherError {
    fn from(err: serde_json::Error) -> Self {
        LauncherError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LauncherError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LauncherError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error means "the referenced thing does not exist".
    pub fn is_not_found(&self) -> bool {
        match self {
            LauncherError::NotFound(_)
            | LauncherError::ProfileNotFound { .. }
            | LauncherError::ShortcutNotFound { .. }
            | LauncherError::PackageNotFound { .. }
            | LauncherError::IconNotFound { .. } => true,
            LauncherError::Io {
                source: Some(source),
                ..
            } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
