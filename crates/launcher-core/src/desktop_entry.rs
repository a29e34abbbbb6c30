//! Desktop entry (.desktop file) parsing.
//!
//! Reads the group/key/value structure of the XDG Desktop Entry format.
//! Only what profiles need is interpreted: the `[Desktop Entry]` group and
//! the `[Desktop Action <id>]` groups, in file order.

use crate::error::{LauncherError, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const MAIN_GROUP: &str = "Desktop Entry";
const ACTION_GROUP_PREFIX: &str = "Desktop Action ";

/// One `[Group]` of a desktop file.
#[derive(Debug, Clone, Default)]
pub struct DesktopGroup {
    pub name: String,
    entries: HashMap<String, String>,
}

impl DesktopGroup {
    /// Look up a key exactly as written (`Name`, not `Name[de]`).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// A `[Desktop Action <id>]` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopAction {
    /// The `<id>` part of the group header.
    pub id: String,
    pub name: String,
    pub exec: String,
}

/// A parsed desktop file.
#[derive(Debug, Clone)]
pub struct DesktopEntryFile {
    pub path: PathBuf,
    groups: Vec<DesktopGroup>,
}

impl DesktopEntryFile {
    /// Read and parse a desktop file.
    ///
    /// Fails if the file cannot be read, has no `[Desktop Entry]` group, or
    /// that group lacks `Name` or `Exec`.
    pub fn parse(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| LauncherError::io_with_path(e, path))?;
        let entry = Self::parse_str(path, &content)?;
        debug!(
            "Parsed {} with {} group(s)",
            path.display(),
            entry.groups.len()
        );
        Ok(entry)
    }

    /// Parse desktop file content; `path` is only used for error context.
    pub fn parse_str(path: &Path, content: &str) -> Result<Self> {
        let mut groups: Vec<DesktopGroup> = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                groups.push(DesktopGroup {
                    name: line[1..line.len() - 1].to_string(),
                    entries: HashMap::new(),
                });
                continue;
            }

            // Keys before the first group header are invalid; skip them.
            let Some(group) = groups.last_mut() else {
                continue;
            };

            if let Some((key, value)) = line.split_once('=') {
                group
                    .entries
                    .entry(key.trim().to_string())
                    .or_insert_with(|| value.trim().to_string());
            }
        }

        let entry = Self {
            path: path.to_path_buf(),
            groups,
        };

        let main = entry.main_group().ok_or_else(|| LauncherError::DesktopEntry {
            path: path.to_path_buf(),
            message: format!("missing [{}] group", MAIN_GROUP),
        })?;
        for key in ["Name", "Exec"] {
            if main.get(key).is_none() {
                return Err(LauncherError::DesktopEntry {
                    path: path.to_path_buf(),
                    message: format!("missing {} key", key),
                });
            }
        }

        Ok(entry)
    }

    pub fn groups(&self) -> &[DesktopGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&DesktopGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn main_group(&self) -> Option<&DesktopGroup> {
        self.group(MAIN_GROUP)
    }

    /// Value of a key in `[Desktop Entry]`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.main_group().and_then(|g| g.get(key))
    }

    pub fn name(&self) -> &str {
        self.get("Name").unwrap_or_default()
    }

    pub fn exec(&self) -> &str {
        self.get("Exec").unwrap_or_default()
    }

    pub fn icon(&self) -> Option<&str> {
        self.get("Icon").filter(|v| !v.is_empty())
    }

    /// Action groups in file order. Actions without `Exec` cannot be launched
    /// and are skipped; a missing `Name` falls back to the action id.
    pub fn actions(&self) -> Vec<DesktopAction> {
        self.groups
            .iter()
            .filter_map(|group| {
                let id = group.name.strip_prefix(ACTION_GROUP_PREFIX)?;
                let Some(exec) = group.get("Exec") else {
                    debug!("Skipping action '{}' without Exec in {}", id, self.path.display());
                    return None;
                };
                Some(DesktopAction {
                    id: id.to_string(),
                    name: group.get("Name").unwrap_or(id).to_string(),
                    exec: exec.to_string(),
                })
            })
            .collect()
    }
}

/// Remove desktop-entry field codes (`%f`, `%U`, ...) from an Exec line.
///
/// Tokens are removed in place without trimming, so `foo %U` becomes `foo `.
/// The escape `%%` becomes a literal `%`.
pub fn strip_field_codes(exec: &str) -> String {
    static FIELD_CODE: OnceLock<Regex> = OnceLock::new();
    let re = FIELD_CODE.get_or_init(|| Regex::new(r"%([A-Za-z%])").expect("valid regex"));

    re.replace_all(exec, |caps: &Captures| {
        if &caps[1] == "%" {
            "%".to_string()
        } else {
            String::new()
        }
    })
    .into_owned()
}
