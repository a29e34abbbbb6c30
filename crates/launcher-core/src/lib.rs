//! crew-launcher core - desktop entries as locally served web apps.
//!
//! This crate owns everything except the HTTP servers:
//! - [`profile`]: per-app JSON profiles and identity resolution
//! - [`daemon`]: lifecycle of the background dispatch server
//! - [`launch`]: fire-and-forget command spawning
//! - [`desktop_entry`], [`icon`], [`package`]: the desktop-file, icon and
//!   package lookups profiles are built from
//!
//! # Example
//!
//! ```rust,no_run
//! use crew_launcher::{LauncherConfig, ProfileStore};
//! use crew_launcher::icon::ThemeIconResolver;
//! use crew_launcher::package::CrewFilelistLocator;
//!
//! fn main() -> crew_launcher::Result<()> {
//!     let config = LauncherConfig::from_env()?;
//!     let mut store = ProfileStore::open(
//!         &config.config_dir,
//!         Box::new(CrewFilelistLocator::new(config.package_meta_dir())),
//!         Box::new(ThemeIconResolver::new(config.icon_dirs.clone())),
//!     )?;
//!
//!     let (id, profile) = store.create("gedit", false)?;
//!     println!("{} -> {}", profile.name, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod daemon;
pub mod desktop_entry;
pub mod error;
pub mod icon;
pub mod launch;
pub mod package;
pub mod platform;
pub mod profile;

pub use config::LauncherConfig;
pub use daemon::{DaemonHandle, DaemonStatus, StopOutcome};
pub use error::{LauncherError, Result};
pub use launch::{CommandSpawner, DetachedSpawner};
pub use profile::{Profile, ProfileId, ProfileStore, ProfileSummary};
