use std::path::Path;

use log::{info, warn};
use selfup_platform::TargetOs;

use super::ensure_package;
use crate::error::InstallError;

pub(super) fn install(path: &Path) -> Result<(), InstallError> {
    ensure_package(path, TargetOs::Windows)?;

    if !path.is_file() {
        warn!("Downloaded installer is missing: {}", path.display());
        return Err(InstallError::HandlerRejected {
            path: path.to_path_buf(),
        });
    }

    info!("Opening installer with the system handler: {}", path.display());
    open::that_detached(path).map_err(|error| {
        warn!("System handler refused {}: {error}", path.display());
        InstallError::HandlerRejected {
            path: path.to_path_buf(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::install;
    use crate::error::InstallError;

    #[test]
    fn missing_installer_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("Viewer.exe");

        let result = install(&path);

        assert!(matches!(
            result,
            Err(InstallError::HandlerRejected { path: rejected }) if rejected == path
        ));
    }

    #[test]
    fn non_installer_files_are_not_opened() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("Viewer.dmg");
        std::fs::write(&path, b"not an exe").expect("fixture should be written");

        assert!(matches!(
            install(&path),
            Err(InstallError::NotAPackage { expected: ".exe", .. })
        ));
    }
}
