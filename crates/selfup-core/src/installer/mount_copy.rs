use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use selfup_platform::{TargetOs, background_command};

use super::{current_binary_name, ensure_package};
use crate::error::InstallError;

const HDIUTIL: &str = "hdiutil";
const VOLUMES_PREFIX: &str = "/Volumes/";

pub(super) async fn install(path: &Path, mount_timeout: Duration) -> Result<(), InstallError> {
    ensure_package(path, TargetOs::MacOs)?;
    let binary_name = current_binary_name()?;

    confirm_close().await?;

    let volume = attach(path, mount_timeout).await?;
    let result = copy_from_volume(&volume, &binary_name);
    detach(&volume).await;
    result
}

fn copy_from_volume(volume: &Path, binary_name: &str) -> Result<(), InstallError> {
    let new_bundle = volume.join(format!("{binary_name}.app"));
    if !new_bundle.is_dir() {
        return Err(InstallError::BundleMissing { path: new_bundle });
    }

    let current_bundle = current_app_bundle()?;
    replace_bundle(&new_bundle, &current_bundle)?;

    info!("macOS update copied from {}", new_bundle.display());
    Ok(())
}

#[cfg(target_os = "macos")]
async fn confirm_close() -> Result<(), InstallError> {
    let answer = rfd::AsyncMessageDialog::new()
        .set_level(rfd::MessageLevel::Info)
        .set_title("Update ready!")
        .set_description(
            "The application will be closed and replaced with the new version.",
        )
        .set_buttons(rfd::MessageButtons::OkCancel)
        .show()
        .await;

    match answer {
        rfd::MessageDialogResult::Cancel | rfd::MessageDialogResult::No => {
            Err(InstallError::Declined)
        }
        _ => Ok(()),
    }
}

#[cfg(not(target_os = "macos"))]
async fn confirm_close() -> Result<(), InstallError> {
    info!("No confirmation dialog on this platform, proceeding with install");
    Ok(())
}

async fn attach(image: &Path, mount_timeout: Duration) -> Result<PathBuf, InstallError> {
    info!("Mounting {}", image.display());
    let output = background_command(HDIUTIL)
        .args(["attach", "-nobrowse"])
        .arg(image)
        .output();

    let output = tokio::time::timeout(mount_timeout, output)
        .await
        .map_err(|_| InstallError::Timeout {
            tool: HDIUTIL,
            seconds: mount_timeout.as_secs(),
        })?
        .map_err(|source| InstallError::Spawn {
            tool: HDIUTIL,
            source,
        })?;

    if !output.status.success() {
        return Err(InstallError::ToolFailed {
            tool: HDIUTIL,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let volume = mounted_volume(&stdout).ok_or(InstallError::VolumeNotFound)?;
    debug!("Disk image mounted at {}", volume.display());
    Ok(volume)
}

async fn detach(volume: &Path) {
    match background_command(HDIUTIL)
        .arg("detach")
        .arg(volume)
        .output()
        .await
    {
        Ok(output) if output.status.success() => debug!("Detached {}", volume.display()),
        Ok(output) => warn!(
            "Failed to detach {}: {}",
            volume.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(error) => warn!("Failed to run hdiutil detach: {error}"),
    }
}

/// Mount point reported by `hdiutil attach`.
///
/// The tool prints one tab-separated row per partition; the mounted one ends
/// with its `/Volumes/...` path, which may contain spaces.
#[must_use]
pub fn mounted_volume(hdiutil_output: &str) -> Option<PathBuf> {
    hdiutil_output.lines().find_map(|line| {
        let start = line.find(VOLUMES_PREFIX)?;
        let volume = line[start..].trim();
        (volume.len() > VOLUMES_PREFIX.len()).then(|| PathBuf::from(volume))
    })
}

fn current_app_bundle() -> Result<PathBuf, InstallError> {
    let exe = std::env::current_exe()
        .map_err(|error| InstallError::io("failed to get current executable", error))?;
    let bundle = exe
        .ancestors()
        .find(|path| path.extension().and_then(|e| e.to_str()) == Some("app"))
        .map(Path::to_path_buf);
    bundle.ok_or(InstallError::BundleMissing { path: exe })
}

fn old_bundle_path(bundle: &Path) -> PathBuf {
    bundle.with_extension("app.old")
}

/// Replace `current` with a copy of `new_bundle`, keeping the previous
/// bundle beside it as `<name>.app.old` until the next start.
///
/// On failure the previous bundle is moved back into place.
///
/// # Errors
/// Returns an error when the old bundle cannot be moved aside or the new one
/// cannot be copied.
pub fn replace_bundle(new_bundle: &Path, current: &Path) -> Result<(), InstallError> {
    let old_bundle = old_bundle_path(current);

    info!(
        "Replacing {} with {}",
        current.display(),
        new_bundle.display()
    );

    if old_bundle.exists() {
        std::fs::remove_dir_all(&old_bundle).map_err(|error| {
            InstallError::io_with_path("failed to remove old backup", &old_bundle, &error)
        })?;
    }

    std::fs::rename(current, &old_bundle).map_err(|error| {
        InstallError::io_with_path("failed to move current app bundle aside", current, &error)
    })?;

    if let Err(error) = copy_dir_recursive(new_bundle, current) {
        warn!("Copy failed, restoring previous bundle: {error}");
        restore_bundle(&old_bundle, current);
        return Err(error);
    }

    Ok(())
}

fn restore_bundle(backup: &Path, current: &Path) {
    if current.exists()
        && let Err(error) = std::fs::remove_dir_all(current)
    {
        warn!(
            "Failed to remove partial bundle {}: {error}",
            current.display()
        );
    }
    if let Err(error) = std::fs::rename(backup, current) {
        warn!(
            "Failed to restore {} from {}: {error}",
            current.display(),
            backup.display()
        );
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), InstallError> {
    std::fs::create_dir_all(dest)
        .map_err(|error| InstallError::io_with_path("failed to create directory", dest, &error))?;

    for entry in std::fs::read_dir(src)
        .map_err(|error| InstallError::io_with_path("failed to read directory", src, &error))?
    {
        let entry =
            entry.map_err(|error| InstallError::io("failed to read directory entry", error))?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|error| {
            InstallError::io_with_path("failed to read file type", &src_path, &error)
        })?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dest_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path).map_err(|error| {
                InstallError::io(
                    "failed to copy file into bundle",
                    std::io::Error::new(
                        error.kind(),
                        format!("{} -> {}: {error}", src_path.display(), dest_path.display()),
                    ),
                )
            })?;
        }
    }
    Ok(())
}

// Frameworks inside app bundles are laid out with relative symlinks.
#[cfg(unix)]
fn copy_symlink(src: &Path, dest: &Path) -> Result<(), InstallError> {
    let target = std::fs::read_link(src)
        .map_err(|error| InstallError::io_with_path("failed to read symlink", src, &error))?;
    std::os::unix::fs::symlink(&target, dest)
        .map_err(|error| InstallError::io_with_path("failed to create symlink", dest, &error))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dest: &Path) -> Result<(), InstallError> {
    std::fs::copy(src, dest)
        .map(|_| ())
        .map_err(|error| InstallError::io_with_path("failed to copy linked file", src, &error))
}

/// Remove the `.app.old` bundle left behind by the previous update.
pub fn cleanup_old_app_bundle() {
    if let Ok(bundle) = current_app_bundle() {
        let old = old_bundle_path(&bundle);
        if old.exists() {
            info!("Cleaning up old app bundle: {}", old.display());
            let _ = std::fs::remove_dir_all(&old);
        }
    }
}
