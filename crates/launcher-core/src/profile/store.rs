//! Profile persistence and identity resolution.

use super::atomic::{read_json, write_json};
use super::model::{app_name_of, Profile, ProfileId};
use crate::config::PathsConfig;
use crate::desktop_entry::DesktopEntryFile;
use crate::error::{LauncherError, Result};
use crate::icon::IconResolver;
use crate::package::DesktopFileLocator;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub id: ProfileId,
    pub source_path: PathBuf,
    pub app_name: String,
}

/// Per-app JSON profiles in a directory, indexed by source desktop file.
pub struct ProfileStore {
    dir: PathBuf,
    locator: Box<dyn DesktopFileLocator>,
    icons: Box<dyn IconResolver>,
    /// source_path -> id, rebuilt on open and kept current by create/delete.
    index: HashMap<PathBuf, ProfileId>,
}

impl ProfileStore {
    /// Open the store, creating the directory if needed, and index existing profiles.
    pub fn open(
        dir: impl Into<PathBuf>,
        locator: Box<dyn DesktopFileLocator>,
        icons: Box<dyn IconResolver>,
    ) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| LauncherError::io_with_path(e, &dir))?;

        let mut store = Self {
            dir,
            locator,
            icons,
            index: HashMap::new(),
        };
        store.rebuild_index()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk location of a profile document.
    pub fn profile_path(&self, id: &ProfileId) -> PathBuf {
        profile_path(&self.dir, id)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();

        for (id, path) in self.profile_files()? {
            match read_json::<Profile>(&path) {
                Ok(Some(profile)) => {
                    if let Some(previous) = self.index.insert(profile.source_path.clone(), id) {
                        warn!(
                            "Profiles {} and {} share {}",
                            previous,
                            id,
                            profile.source_path.display()
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable profile {}: {}", path.display(), e),
            }
        }

        debug!("Indexed {} profile(s) in {}", self.index.len(), self.dir.display());
        Ok(())
    }

    /// Every `<uuid>.json` in the store directory.
    fn profile_files(&self) -> Result<Vec<(ProfileId, PathBuf)>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| LauncherError::io_with_path(e, &self.dir))?;

        let mut files = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PathsConfig::PROFILE_EXTENSION) {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<ProfileId>().ok())
            else {
                continue;
            };
            files.push((id, path));
        }
        Ok(files)
    }

    /// Turn a CLI reference into a desktop file path.
    ///
    /// Absolute paths are taken as-is, a relative `*.desktop` path that exists
    /// is made absolute, anything else is a package name.
    pub fn resolve_reference(&self, reference: &str) -> Result<PathBuf> {
        if reference.starts_with('/') {
            return Ok(PathBuf::from(reference));
        }

        let relative = Path::new(reference);
        if reference.ends_with(".desktop") && relative.is_file() {
            return std::path::absolute(relative)
                .map_err(|e| LauncherError::io_with_path(e, relative));
        }

        self.locator
            .find_desktop_file(reference)?
            .ok_or_else(|| LauncherError::PackageNotFound {
                package: reference.to_string(),
            })
    }

    /// Identifier of the profile created from `reference`, if any.
    pub fn resolve_identifier(&self, reference: &str) -> Result<Option<ProfileId>> {
        let path = self.resolve_reference(reference)?;
        Ok(self.index.get(&path).copied())
    }

    /// Create (or replace) the profile for a desktop entry.
    ///
    /// With `update_existing`, a prior profile for the same desktop file keeps
    /// its identifier and is overwritten. Otherwise a new identifier is
    /// generated and the prior profile is deleted once the new one is written.
    pub fn create(
        &mut self,
        reference: &str,
        update_existing: bool,
    ) -> Result<(ProfileId, Profile)> {
        let source_path = self.resolve_reference(reference)?;
        if !source_path.exists() {
            return Err(LauncherError::NotFound(source_path));
        }

        let entry = DesktopEntryFile::parse(&source_path)?;
        let previous = self.index.get(&source_path).copied();

        let id = match previous {
            Some(id) if update_existing => id,
            _ => ProfileId::generate(),
        };

        let icon_name = entry.icon().ok_or_else(|| LauncherError::DesktopEntry {
            path: source_path.clone(),
            message: "missing Icon key".to_string(),
        })?;
        let icon = self.icons.find(icon_name)?;

        let profile = Profile::from_desktop_entry(id, &source_path, &entry, icon);
        write_json(&self.profile_path(&id), &profile)?;
        self.index.insert(source_path.clone(), id);

        if let Some(old) = previous.filter(|old| *old != id) {
            self.remove_file(&old)?;
            info!("Replaced profile {} with {}", old, id);
        }

        info!("Wrote profile {} for {}", id, source_path.display());
        Ok((id, profile))
    }

    /// Load a profile; `None` if no document exists for `id`.
    pub fn load(&self, id: &ProfileId) -> Result<Option<Profile>> {
        load_profile(&self.dir, id)
    }

    /// Delete a profile. Returns whether a document existed.
    pub fn delete(&mut self, id: &ProfileId) -> Result<bool> {
        let existed = self.remove_file(id)?;
        self.index.retain(|_, indexed| indexed != id);
        Ok(existed)
    }

    fn remove_file(&self, id: &ProfileId) -> Result<bool> {
        let path = self.profile_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LauncherError::io_with_path(e, path)),
        }
    }

    /// Summaries of all indexed profiles, sorted by app name.
    pub fn list(&self) -> Vec<ProfileSummary> {
        let mut summaries: Vec<ProfileSummary> = self
            .index
            .iter()
            .map(|(source_path, id)| ProfileSummary {
                id: *id,
                source_path: source_path.clone(),
                app_name: app_name_of(source_path),
            })
            .collect();
        summaries.sort_by(|a, b| a.app_name.cmp(&b.app_name).then(a.id.cmp(&b.id)));
        summaries
    }
}

/// Path of the document for `id` inside `dir`.
pub fn profile_path(dir: &Path, id: &ProfileId) -> PathBuf {
    dir.join(format!("{}.{}", id, PathsConfig::PROFILE_EXTENSION))
}

/// Load a profile straight from disk without opening a store.
///
/// The dispatch server uses this so profiles added after it started are seen.
pub fn load_profile(dir: &Path, id: &ProfileId) -> Result<Option<Profile>> {
    read_json(&profile_path(dir, id))
}
