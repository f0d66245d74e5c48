//! Self-update client for desktop applications.
//!
//! The updater asks a statically hosted JSON manifest whether a newer,
//! date-versioned build exists for this operating system, streams the new
//! package to a temp file, and hands it to the installer compiled in for the
//! platform. Every outcome is reported through one [`UpdateStatusListener`].
//!
//! - [`manifest`]: changelog model and manifest evaluation.
//! - [`AutoUpdater`]: check, download, and install driver.
//! - [`Installer`]: per-platform install strategies.

mod config;
mod download;
mod error;
pub mod installer;
mod listener;
pub mod manifest;
mod updater;

/// Updater settings and their validation.
pub use config::UpdaterConfig;
/// Streaming download helpers.
pub use download::{SessionGuard, SessionSlot, download_percentage, stream_to_file};
/// Error taxonomy reported through the listener.
pub use error::{ConfigError, InstallError, UpdateError};
/// Platform install strategies.
pub use installer::Installer;
/// Listener contract plus a channel-backed implementation.
pub use listener::{ChannelListener, UpdateEvent, UpdateStatusListener};
/// Changelog model and version comparison.
pub use manifest::{ChangeLog, VersionEntry, evaluate_manifest, is_newer_version};
/// Update driver and its observable state.
pub use updater::{AutoUpdater, QuitHook, UpdatePhase};
