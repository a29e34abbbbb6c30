//! Shared fixtures for the server integration tests.

#![allow(dead_code)]

use crew_launcher::icon::ThemeIconResolver;
use crew_launcher::package::CrewFilelistLocator;
use crew_launcher::{CommandSpawner, LauncherConfig, Profile, ProfileId, ProfileStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Eight bytes is enough to tell the icon apart from other responses.
pub const ICON_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

pub const APP_PAGE: &str = "<html><body>launching</body></html>";

/// A temporary launcher layout with assets and one icon.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config: LauncherConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = LauncherConfig::with_root(temp_dir.path());
        config.ensure_dirs().unwrap();

        fs::create_dir_all(&config.asset_dir).unwrap();
        fs::write(config.asset_dir.join("installer.html"), "<html>install</html>").unwrap();
        fs::write(config.asset_dir.join("app.html"), APP_PAGE).unwrap();
        fs::write(config.asset_dir.join("style.css"), "body { color: black; }").unwrap();

        fs::create_dir_all(temp_dir.path().join("icons")).unwrap();
        fs::write(temp_dir.path().join("icons").join("foo.png"), ICON_BYTES).unwrap();

        Self { temp_dir, config }
    }

    pub fn icon_path(&self) -> PathBuf {
        self.temp_dir.path().join("icons").join("foo.png")
    }

    pub fn store(&self) -> ProfileStore {
        ProfileStore::open(
            &self.config.config_dir,
            Box::new(CrewFilelistLocator::new(self.config.package_meta_dir())),
            Box::new(ThemeIconResolver::new(Vec::new())),
        )
        .unwrap()
    }

    /// Write `<name>.desktop` with the given body lines and an absolute icon.
    pub fn write_desktop_file(&self, name: &str, body: &str) -> PathBuf {
        let dir = self.temp_dir.path().join("applications");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.desktop", name));
        let content = format!(
            "[Desktop Entry]\nType=Application\nIcon={}\n{}",
            self.icon_path().display(),
            body
        );
        fs::write(&path, content).unwrap();
        path
    }

    /// Create a profile for `Name=Foo`, `Exec=foo %U` with one `new-window` action.
    pub fn add_foo(&self) -> (ProfileId, Profile) {
        let path = self.write_desktop_file(
            "foo",
            "Name=Foo\nExec=foo %U\nActions=new-window;\n\n\
             [Desktop Action new-window]\nName=New Window\nExec=foo --new-window %U\n",
        );
        self.store().create(path.to_str().unwrap(), false).unwrap()
    }

    pub fn profile_path(&self, id: &ProfileId) -> PathBuf {
        crew_launcher::profile::profile_path(&self.config.config_dir, id)
    }
}

/// Records spawn requests instead of running them.
#[derive(Default)]
pub struct RecordingSpawner {
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingSpawner {
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandSpawner for RecordingSpawner {
    fn spawn(&self, command_line: &str, log_path: &Path) -> crew_launcher::Result<u32> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((command_line.to_string(), log_path.to_path_buf()));
        Ok(40_000 + calls.len() as u32)
    }
}
