//! Platform install strategies.
//!
//! Exactly one strategy matches the OS the binary was built for, picked by
//! [`Installer::for_current_platform`]. Each takes the path of a completed
//! download and either leaves the new build ready to run (the caller then
//! quits the application) or reports why it could not.

mod handler_open;
mod mount_copy;
mod portable_replace;

use std::path::Path;
use std::time::Duration;

use selfup_platform::TargetOs;

use crate::error::InstallError;

pub use mount_copy::{cleanup_old_app_bundle, mounted_volume, replace_bundle};
pub use portable_replace::replace_executable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installer {
    /// Ask the OS to open the package with its registered handler.
    HandlerOpen,
    /// Mount a disk image, confirm with the user, and copy the bundle over
    /// the running one.
    MountAndCopy { mount_timeout: Duration },
    /// Swap the running portable executable for the downloaded one.
    PortableReplace,
}

impl Installer {
    #[must_use]
    pub const fn for_os(os: TargetOs, mount_timeout: Duration) -> Self {
        match os {
            TargetOs::Windows => Self::HandlerOpen,
            TargetOs::MacOs => Self::MountAndCopy { mount_timeout },
            TargetOs::Linux => Self::PortableReplace,
        }
    }

    #[must_use]
    pub const fn for_current_platform(mount_timeout: Duration) -> Self {
        Self::for_os(TargetOs::current(), mount_timeout)
    }

    /// Whether the application quits even when the install failed.
    ///
    /// Handing the package to the OS handler means the installer now owns
    /// the machine's copy of the app, so the app quits either way.
    #[must_use]
    pub const fn quits_on_failure(self) -> bool {
        matches!(self, Self::HandlerOpen)
    }

    /// Install the package at `path`.
    ///
    /// # Errors
    /// Returns an [`InstallError`] describing the first step that failed.
    pub async fn install(self, path: &Path) -> Result<(), InstallError> {
        match self {
            Self::HandlerOpen => handler_open::install(path),
            Self::MountAndCopy { mount_timeout } => mount_copy::install(path, mount_timeout).await,
            Self::PortableReplace => portable_replace::install(path),
        }
    }
}

/// File stem of the running executable, used to find the matching bundle
/// inside a package.
pub(crate) fn current_binary_name() -> Result<String, InstallError> {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or(InstallError::BinaryNameUnavailable)
}

/// Reject anything that is not the package type `os` publishes.
pub(crate) fn ensure_package(path: &Path, os: TargetOs) -> Result<(), InstallError> {
    if os.is_install_package(path) {
        Ok(())
    } else {
        Err(InstallError::NotAPackage {
            path: path.to_path_buf(),
            expected: os.install_extension(),
        })
    }
}
