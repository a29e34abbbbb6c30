//! HTTP servers for crew-launcher.
//!
//! - [`Installer`]: one-shot server driving the PWA install of one profile
//! - [`DispatchServer`]: long-lived server turning `GET /<id>/run` into a
//!   launched command
//!
//! Both handle one request at a time and shut down gracefully, so the
//! response to a stop request is always delivered.

mod assets;
pub mod dispatch;
pub mod installer;
mod serve;

pub use dispatch::{DispatchExit, DispatchServer, LaunchOutcome, STOP_NOTICE};
pub use installer::{run_installer, Installer};
pub use serve::{bind, shutdown_signal};
