//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here:
//! - `process` - liveness checks, termination signals, process table scans
//! - `browser` - opening URLs through the configured system opener
//!
//! Linux (Chrome OS with Chromebrew in particular) is the supported target.

pub mod browser;
pub mod process;

pub use browser::open_url;
pub use process::{find_processes, is_process_alive, process_cmdline, send_terminate, SignalOutcome};
