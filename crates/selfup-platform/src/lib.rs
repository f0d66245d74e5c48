//! Platform facts shared by the updater crates.
//!
//! - Which manifest section and installer package belong to this build.
//! - Where downloads, settings, and logs live on disk.
//! - Spawning helper processes without flashing a console window.

mod os;
mod paths;
mod process;

pub use os::{TargetOs, update_download_path};
pub use paths::{AppPaths, AppPathsError};
pub use process::{HideWindow, background_command};
