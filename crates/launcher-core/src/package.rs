//! Package name to desktop entry resolution.

use crate::error::{LauncherError, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Finds the desktop entry a package installs.
pub trait DesktopFileLocator: Send + Sync {
    /// Returns `None` when the package is known but ships no desktop entry.
    fn find_desktop_file(&self, package: &str) -> Result<Option<PathBuf>>;
}

/// Reads Chromebrew package file lists (`<prefix>/etc/crew/meta/<pkg>.filelist`).
pub struct CrewFilelistLocator {
    meta_dir: PathBuf,
}

impl CrewFilelistLocator {
    pub fn new(meta_dir: impl Into<PathBuf>) -> Self {
        Self {
            meta_dir: meta_dir.into(),
        }
    }
}

impl DesktopFileLocator for CrewFilelistLocator {
    fn find_desktop_file(&self, package: &str) -> Result<Option<PathBuf>> {
        if package.is_empty() || package.contains('/') {
            return Err(LauncherError::PackageNotFound {
                package: package.to_string(),
            });
        }

        let filelist = self.meta_dir.join(format!("{}.filelist", package));
        let content = match fs::read_to_string(&filelist) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LauncherError::PackageNotFound {
                    package: package.to_string(),
                });
            }
            Err(e) => return Err(LauncherError::io_with_path(e, filelist)),
        };

        let found = content
            .lines()
            .map(str::trim)
            .find(|line| line.ends_with(".desktop") && line.contains("/share/applications/"))
            .map(PathBuf::from);

        debug!("Package {} desktop entry: {:?}", package, found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finds_desktop_entry_in_filelist() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("gedit.filelist"),
            "/usr/local/bin/gedit\n\
             /usr/local/share/applications/org.gnome.gedit.desktop\n\
             /usr/local/share/gedit/x.desktop\n",
        )
        .unwrap();

        let locator = CrewFilelistLocator::new(temp_dir.path());
        assert_eq!(
            locator.find_desktop_file("gedit").unwrap(),
            Some(PathBuf::from("/usr/local/share/applications/org.gnome.gedit.desktop"))
        );
    }

    #[test]
    fn test_package_without_desktop_entry() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("jq.filelist"), "/usr/local/bin/jq\n").unwrap();

        let locator = CrewFilelistLocator::new(temp_dir.path());
        assert_eq!(locator.find_desktop_file("jq").unwrap(), None);
    }

    #[test]
    fn test_unknown_package() {
        let temp_dir = TempDir::new().unwrap();
        let locator = CrewFilelistLocator::new(temp_dir.path());

        let err = locator.find_desktop_file("missing").unwrap_err();
        assert!(matches!(err, LauncherError::PackageNotFound { .. }));
        assert!(locator.find_desktop_file("../etc").is_err());
    }
}
