use std::path::{Path, PathBuf};

/// Operating systems a manifest can publish builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Windows,
    MacOs,
    Linux,
}

impl TargetOs {
    /// The operating system this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Key of this OS's section in the update manifest.
    #[must_use]
    pub const fn manifest_key(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "MacOS",
            Self::Linux => "Linux",
        }
    }

    /// File extension (with the leading dot) of the installer package
    /// published for this OS.
    #[must_use]
    pub const fn install_extension(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::MacOs => ".dmg",
            Self::Linux => ".AppImage",
        }
    }

    /// Whether `path` carries this OS's package extension, ignoring case.
    #[must_use]
    pub fn is_install_package(self, path: &Path) -> bool {
        let expected = self.install_extension().trim_start_matches('.');
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(expected))
    }
}

/// Where a downloaded update for `app_name` is written before installing.
#[must_use]
pub fn update_download_path(app_name: &str) -> PathBuf {
    let extension = TargetOs::current().install_extension();
    std::env::temp_dir().join(format!("{app_name}{extension}"))
}
