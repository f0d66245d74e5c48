use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    #[serde(default)]
    pub manifest_url: String,

    /// Version of the running build, `yyyy.MM.dd`.
    #[serde(default)]
    pub current_version: String,

    /// Names the downloaded package and locates the installed bundle.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_trusted_hosts")]
    pub trusted_hosts: Vec<String>,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_mount_timeout")]
    pub mount_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_app_name() -> String {
    "selfup".to_string()
}

fn default_trusted_hosts() -> Vec<String> {
    vec!["raw.githubusercontent.com".to_string()]
}

fn default_max_redirects() -> usize {
    5
}

fn default_mount_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("selfup/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            manifest_url: String::new(),
            current_version: String::new(),
            app_name: default_app_name(),
            trusted_hosts: default_trusted_hosts(),
            max_redirects: default_max_redirects(),
            mount_timeout_secs: default_mount_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpdaterConfig {
    pub fn new(manifest_url: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            current_version: current_version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    #[must_use]
    pub fn mount_timeout(&self) -> Duration {
        Duration::from_secs(self.mount_timeout_secs)
    }

    /// Check construction preconditions and return the parsed manifest URL.
    ///
    /// # Errors
    /// Returns an error when the current version or app name is empty, or the
    /// manifest URL is not an `https` URL on one of the trusted hosts.
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.current_version.trim().is_empty() {
            return Err(ConfigError::EmptyCurrentVersion);
        }
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::EmptyAppName);
        }

        let url =
            Url::parse(&self.manifest_url).map_err(|error| ConfigError::InvalidManifestUrl {
                url: self.manifest_url.clone(),
                reason: error.to_string(),
            })?;

        if url.scheme() != "https" {
            return Err(ConfigError::InsecureManifestUrl {
                scheme: url.scheme().to_string(),
            });
        }

        let host = url.host_str().unwrap_or_default();
        if !self
            .trusted_hosts
            .iter()
            .any(|trusted| trusted.eq_ignore_ascii_case(host))
        {
            return Err(ConfigError::UntrustedHost {
                host: host.to_string(),
            });
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::UpdaterConfig;
    use crate::error::ConfigError;

    const MANIFEST: &str = "https://raw.githubusercontent.com/acme/viewer/main/update.json";

    #[test]
    fn defaults_match_download_policy() {
        let config = UpdaterConfig::default();

        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.mount_timeout_secs, 60);
        assert_eq!(config.trusted_hosts, vec!["raw.githubusercontent.com"]);
        assert!(config.user_agent.starts_with("selfup/"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: UpdaterConfig = serde_json::from_value(json!({
            "manifest_url": MANIFEST,
            "current_version": "2023.01.01"
        }))
        .expect("partial config should deserialize");

        assert_eq!(config.app_name, "selfup");
        assert_eq!(config.max_redirects, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_version() {
        let config = UpdaterConfig::new(MANIFEST, "  ");

        assert_eq!(config.validate(), Err(ConfigError::EmptyCurrentVersion));
    }

    #[test]
    fn validate_rejects_untrusted_and_insecure_urls() {
        let untrusted = UpdaterConfig::new("https://example.com/update.json", "2023.01.01");
        let insecure = UpdaterConfig::new(
            "http://raw.githubusercontent.com/acme/viewer/main/update.json",
            "2023.01.01",
        );
        let garbage = UpdaterConfig::new("not a url", "2023.01.01");

        assert_eq!(
            untrusted.validate(),
            Err(ConfigError::UntrustedHost {
                host: "example.com".to_string()
            })
        );
        assert_eq!(
            insecure.validate(),
            Err(ConfigError::InsecureManifestUrl {
                scheme: "http".to_string()
            })
        );
        assert!(matches!(
            garbage.validate(),
            Err(ConfigError::InvalidManifestUrl { .. })
        ));
    }

    #[test]
    fn trusted_hosts_can_be_extended() {
        let mut config = UpdaterConfig::new("https://updates.acme.dev/manifest.json", "2023.01.01");
        config.trusted_hosts.push("updates.acme.dev".to_string());

        let url = config.validate().expect("extended host list should accept URL");
        assert_eq!(url.host_str(), Some("updates.acme.dev"));
    }
}
