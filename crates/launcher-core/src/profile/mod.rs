//! Web app profiles.
//!
//! A profile describes one launchable desktop application. It is created
//! from a desktop entry, stored as `<config-dir>/<id>.json`, and served as
//! the web app manifest during installation.
//!
//! Each desktop file has at most one profile. Re-adding an entry either
//! keeps the identifier (update mode) or issues a new one and removes the
//! superseded document after the new one is written.

mod atomic;
mod model;
mod store;

pub use model::{Profile, ProfileIcon, ProfileId, Shortcut};
pub use store::{load_profile, profile_path, ProfileStore, ProfileSummary};
