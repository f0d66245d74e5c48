use std::path::PathBuf;

use thiserror::Error;

/// Failures reported to the listener as a terminal outcome of one check or
/// download. The listener receives the `Display` text.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Network request rejected")]
    NetworkRejected(#[source] reqwest::Error),
    #[error("{0}")]
    Transport(#[source] reqwest::Error),
    #[error("Server replied with HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("No data downloaded.")]
    EmptyResponse,
    #[error("Failed to open temporary file {}", path.display())]
    TempFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write update to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to launch the downloaded update.")]
    InstallLaunch(#[source] InstallError),
}

impl UpdateError {
    /// Classify an error from sending a request: requests that could not
    /// even be built are rejected, everything else is a transport failure.
    pub(crate) fn from_send(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::NetworkRejected(error)
        } else {
            Self::Transport(error)
        }
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error)
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Cannot install update: {} is not a {expected} package", path.display())]
    NotAPackage {
        path: PathBuf,
        expected: &'static str,
    },
    #[error("Failed to determine the application binary name")]
    BinaryNameUnavailable,
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} did not finish within {seconds}s")]
    Timeout { tool: &'static str, seconds: u64 },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("No mounted volume found in hdiutil output")]
    VolumeNotFound,
    #[error("No bundle found at {}", path.display())]
    BundleMissing { path: PathBuf },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("The operating system refused to open {}", path.display())]
    HandlerRejected { path: PathBuf },
    #[error("The user dismissed the update confirmation")]
    Declined,
}

impl InstallError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn io_with_path(
        context: &'static str,
        path: &std::path::Path,
        source: &std::io::Error,
    ) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}

/// Construction-time violations of the updater's preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("current version must not be empty")]
    EmptyCurrentVersion,
    #[error("application name must not be empty")]
    EmptyAppName,
    #[error("invalid manifest URL '{url}': {reason}")]
    InvalidManifestUrl { url: String, reason: String },
    #[error("manifest URL must use https, got '{scheme}'")]
    InsecureManifestUrl { scheme: String },
    #[error("manifest host '{host}' is not trusted")]
    UntrustedHost { host: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{InstallError, UpdateError};

    #[test]
    fn listener_messages_match_fixed_texts() {
        assert_eq!(UpdateError::EmptyResponse.to_string(), "No data downloaded.");
        assert_eq!(
            UpdateError::InstallLaunch(InstallError::BinaryNameUnavailable).to_string(),
            "Failed to launch the downloaded update."
        );
    }

    #[test]
    fn temp_file_error_names_the_path() {
        let error = UpdateError::TempFileOpen {
            path: PathBuf::from("/tmp/Viewer.dmg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };

        assert_eq!(
            error.to_string(),
            "Failed to open temporary file /tmp/Viewer.dmg"
        );
    }

    #[test]
    fn io_with_path_keeps_kind_and_mentions_path() {
        let source = std::io::Error::from(std::io::ErrorKind::NotFound);
        let error = InstallError::io_with_path("failed to copy", "/Volumes/App".as_ref(), &source);

        match error {
            InstallError::Io { context, source } => {
                assert_eq!(context, "failed to copy");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
                assert!(source.to_string().contains("/Volumes/App"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
