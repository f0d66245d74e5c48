use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::info;
use selfup_platform::TargetOs;

use super::ensure_package;
use crate::error::InstallError;

/// Set by the AppImage runtime to the image file the app was started from.
const APPIMAGE_ENV: &str = "APPIMAGE";

pub(super) fn install(path: &Path) -> Result<(), InstallError> {
    ensure_package(path, TargetOs::Linux)?;
    mark_executable(path)?;

    if let Some(image) = appimage_path(std::env::var_os(APPIMAGE_ENV)) {
        info!("Replacing AppImage {}", image.display());
        return replace_executable(path, &image);
    }

    replace_running_executable(path)
}

fn appimage_path(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|value| !value.is_empty()).map(PathBuf::from)
}

#[cfg(target_os = "linux")]
fn replace_running_executable(new_binary: &Path) -> Result<(), InstallError> {
    info!("Replacing running executable via self-replace");
    self_replace::self_replace(new_binary)
        .map_err(|error| InstallError::io("failed to replace running executable", error))
}

#[cfg(not(target_os = "linux"))]
fn replace_running_executable(new_binary: &Path) -> Result<(), InstallError> {
    let exe = std::env::current_exe()
        .map_err(|error| InstallError::io("failed to get current executable", error))?;
    replace_executable(new_binary, &exe)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|error| {
        InstallError::io_with_path("failed to mark update executable", path, &error)
    })
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), InstallError> {
    Ok(())
}

/// Atomically put a copy of `new_binary` at `target`.
///
/// The copy is staged next to `target` so the final rename never crosses
/// filesystems; a failed copy leaves `target` untouched.
///
/// # Errors
/// Returns an error when staging the copy or renaming it over `target` fails.
pub fn replace_executable(new_binary: &Path, target: &Path) -> Result<(), InstallError> {
    let mut staged_name = target.file_name().unwrap_or_default().to_os_string();
    staged_name.push(".new");
    let staged = target.with_file_name(staged_name);

    std::fs::copy(new_binary, &staged).map_err(|error| {
        InstallError::io_with_path("failed to stage update next to target", &staged, &error)
    })?;

    if let Err(error) = std::fs::rename(&staged, target) {
        let _ = std::fs::remove_file(&staged);
        return Err(InstallError::io_with_path(
            "failed to move update into place",
            target,
            &error,
        ));
    }

    info!("Installed {} over {}", new_binary.display(), target.display());
    Ok(())
}
