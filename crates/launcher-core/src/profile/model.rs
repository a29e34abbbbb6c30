//! Profile document types.
//!
//! A profile is stored as JSON and served verbatim as the web app manifest,
//! so field names follow the manifest vocabulary.

use crate::desktop_entry::{strip_field_codes, DesktopEntryFile};
use crate::error::{LauncherError, Result};
use crate::icon::ResolvedIcon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Randomly generated identifier of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ProfileId {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| LauncherError::InvalidProfileId(s.to_string()))
    }
}

/// The single icon of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIcon {
    /// URL the installer serves the icon at.
    pub src: String,
    /// Local file holding the icon.
    pub path: PathBuf,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// A named secondary action of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub action: String,
    pub name: String,
    pub url: String,
    pub exec: String,
}

/// A launchable application, persisted as `<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(rename = "desktop_entry_file")]
    pub source_path: PathBuf,
    pub background_color: String,
    pub theme_color: String,
    pub name: String,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub start_url: String,
    pub scope: String,
    pub display: String,
    /// Primary command line, field codes stripped.
    pub exec: String,
    pub icons: Vec<ProfileIcon>,
    #[serde(default)]
    pub shortcuts: Vec<Shortcut>,
}

impl Profile {
    /// Build a profile from a parsed desktop entry and its resolved icon.
    pub fn from_desktop_entry(
        id: ProfileId,
        source_path: &Path,
        entry: &DesktopEntryFile,
        icon: ResolvedIcon,
    ) -> Self {
        let shortcuts = entry
            .actions()
            .into_iter()
            .map(|action| Shortcut {
                url: format!(
                    "/{}/run?shortcut={}",
                    id,
                    urlencoding::encode(&action.id)
                ),
                exec: strip_field_codes(&action.exec),
                name: action.name,
                action: action.id,
            })
            .collect();

        Self {
            id,
            source_path: source_path.to_path_buf(),
            background_color: "black".to_string(),
            theme_color: "black".to_string(),
            name: entry.name().to_string(),
            short_name: entry.get("GenericName").map(String::from),
            description: entry.get("Comment").map(String::from),
            start_url: format!("/{}/run", id),
            scope: format!("/{}/", id),
            display: "standalone".to_string(),
            exec: strip_field_codes(entry.exec()),
            icons: vec![ProfileIcon {
                src: format!("/{}/appicon", id),
                path: icon.path,
                sizes: icon.sizes,
                mime_type: icon.mime_type,
            }],
            shortcuts,
        }
    }

    pub fn icon(&self) -> Option<&ProfileIcon> {
        self.icons.first()
    }

    /// Command line for the primary action or the named shortcut.
    ///
    /// There is no fallback: an unknown shortcut name is an error.
    pub fn command_line(&self, shortcut: Option<&str>) -> Result<&str> {
        match shortcut {
            None => Ok(&self.exec),
            Some(name) => self
                .shortcuts
                .iter()
                .find(|s| s.action == name)
                .map(|s| s.exec.as_str())
                .ok_or_else(|| LauncherError::ShortcutNotFound {
                    id: self.id.to_string(),
                    name: name.to_string(),
                }),
        }
    }

    /// Desktop file stem, used as the app name in listings.
    pub fn app_name(&self) -> String {
        app_name_of(&self.source_path)
    }
}

pub(crate) fn app_name_of(source_path: &Path) -> String {
    source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
