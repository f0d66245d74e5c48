use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use log::{debug, info, warn};
use reqwest::Url;
use reqwest::redirect::{Attempt, Policy};
use selfup_platform::{TargetOs, update_download_path};

use crate::config::UpdaterConfig;
use crate::download::{SessionSlot, stream_to_file};
use crate::error::{ConfigError, InstallError, UpdateError};
use crate::installer::Installer;
use crate::listener::UpdateStatusListener;
use crate::manifest::evaluate_manifest;

/// Called once an install succeeded and the application should exit.
pub type QuitHook = Arc<dyn Fn() + Send + Sync>;

/// Where the updater is in its check, download, and install cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    NoUpdate,
    UpdateAvailable,
    CheckError,
    Downloading,
    DownloadError,
    Downloaded,
    Installing,
    InstallError,
    Terminated,
}

pub struct AutoUpdater {
    config: UpdaterConfig,
    manifest_url: Url,
    os: TargetOs,
    client: reqwest::Client,
    listener: Arc<dyn UpdateStatusListener>,
    installer: Installer,
    session: SessionSlot,
    phase: Mutex<UpdatePhase>,
    quit: QuitHook,
}

impl AutoUpdater {
    /// Build an updater for the current platform.
    ///
    /// # Errors
    /// Returns an error when `config` breaks a construction precondition (see
    /// [`UpdaterConfig::validate`]) or the HTTP client cannot be built.
    pub fn new(
        config: UpdaterConfig,
        listener: Arc<dyn UpdateStatusListener>,
    ) -> Result<Self, ConfigError> {
        let manifest_url = config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .https_only(true)
            .redirect(redirect_policy(config.max_redirects))
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;
        let installer = Installer::for_current_platform(config.mount_timeout());

        Ok(Self {
            config,
            manifest_url,
            os: TargetOs::current(),
            client,
            listener,
            installer,
            session: SessionSlot::default(),
            phase: Mutex::new(UpdatePhase::Idle),
            quit: Arc::new(|| std::process::exit(0)),
        })
    }

    /// Replace the default exit of the process after a successful install,
    /// for example with the UI toolkit's own shutdown.
    #[must_use]
    pub fn with_quit_hook(mut self, quit: QuitHook) -> Self {
        self.quit = quit;
        self
    }

    /// Use `installer` instead of the one compiled in for this platform.
    #[must_use]
    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = installer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> UpdatePhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: UpdatePhase) {
        debug!("Update phase: {phase:?}");
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn fail(&self, phase: UpdatePhase, error: &UpdateError) {
        warn!("Update failed ({phase:?}): {error}");
        self.set_phase(phase);
        self.listener.on_update_error(error.to_string());
    }

    /// Fetch the manifest and report the changelog for this OS.
    ///
    /// The listener gets exactly one callback: `on_update_available` (with an
    /// empty changelog when nothing newer exists) or `on_update_error`.
    pub async fn check_for_updates(&self) {
        self.set_phase(UpdatePhase::Checking);

        match self.fetch_manifest().await {
            Ok(body) => self.report_manifest(&body),
            Err(error) => self.fail(UpdatePhase::CheckError, &error),
        }
    }

    async fn fetch_manifest(&self) -> Result<Bytes, UpdateError> {
        info!("Checking for updates at {}", self.manifest_url);
        let response = self
            .client
            .get(self.manifest_url.clone())
            .send()
            .await
            .map_err(UpdateError::from_send)?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                status: response.status(),
            });
        }

        response.bytes().await.map_err(UpdateError::Transport)
    }

    /// Evaluate a downloaded manifest body and send the single outcome to the
    /// listener.
    pub fn report_manifest(&self, body: &[u8]) {
        match evaluate_manifest(body, self.os.manifest_key(), &self.config.current_version) {
            Ok(changelog) => {
                let phase = match changelog.first() {
                    Some(entry) => {
                        info!("Version {} available", entry.version);
                        UpdatePhase::UpdateAvailable
                    }
                    None => {
                        info!("No update available");
                        UpdatePhase::NoUpdate
                    }
                };
                self.set_phase(phase);
                self.listener.on_update_available(changelog);
            }
            Err(error) => self.fail(UpdatePhase::CheckError, &error),
        }
    }

    /// Download the package at `url` and hand it to this platform's installer.
    ///
    /// On a successful install the quit hook runs.
    ///
    /// # Panics
    /// Panics if another download from this updater is still in progress.
    pub async fn download_and_install_update(&self, url: &str) {
        let path = match self.download_update(url).await {
            Ok(path) => path,
            Err(error) => {
                self.fail(UpdatePhase::DownloadError, &error);
                return;
            }
        };

        self.complete_download(&path).await;
    }

    /// Report a finished download at `path` and run the installer on it.
    ///
    /// The listener sees a final 100% report, then the finished callback,
    /// then an error if the install fails.
    pub async fn complete_download(&self, path: &Path) {
        self.set_phase(UpdatePhase::Downloaded);
        self.listener.on_update_download_progress(100.0);
        self.listener.on_update_download_finished();

        self.set_phase(UpdatePhase::Installing);
        let outcome = self.installer.install(path).await;
        self.conclude_install(outcome);
    }

    async fn download_update(&self, url: &str) -> Result<PathBuf, UpdateError> {
        let _session = self.session.open();
        self.set_phase(UpdatePhase::Downloading);

        let path = update_download_path(&self.config.app_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|source| UpdateError::TempFileOpen {
                path: path.clone(),
                source,
            })?;
        debug!("Download session opened at {}", path.display());

        info!("Downloading update from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(UpdateError::from_send)?;

        if !response.status().is_success() {
            return Err(UpdateError::HttpStatus {
                status: response.status(),
            });
        }

        let total = response.content_length();
        let listener = &self.listener;
        let received = stream_to_file(
            response.bytes_stream(),
            total,
            &mut file,
            &path,
            |percent| listener.on_update_download_progress(percent),
        )
        .await?;
        drop(file);

        info!("Download complete: {received} bytes");
        Ok(path)
    }

    fn conclude_install(&self, outcome: Result<(), InstallError>) {
        match outcome {
            Ok(()) => {
                info!("Update installed, quitting");
                self.set_phase(UpdatePhase::Terminated);
                (self.quit)();
            }
            Err(error) => {
                self.fail(UpdatePhase::InstallError, &UpdateError::InstallLaunch(error));
                if self.installer.quits_on_failure() {
                    info!("Installer owns the update now, quitting anyway");
                    (self.quit)();
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RedirectDecision {
    Follow,
    TooMany,
    Downgrade,
}

/// At most `max_redirects` hops, and never from `https` to anything less.
fn redirect_decision(previous: &[Url], next: &Url, max_redirects: usize) -> RedirectDecision {
    if previous.len() > max_redirects {
        return RedirectDecision::TooMany;
    }

    let from_https = previous.last().is_some_and(|url| url.scheme() == "https");
    if from_https && next.scheme() != "https" {
        return RedirectDecision::Downgrade;
    }

    RedirectDecision::Follow
}

fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        match redirect_decision(attempt.previous(), attempt.url(), max_redirects) {
            RedirectDecision::Follow => attempt.follow(),
            RedirectDecision::TooMany => attempt.error("too many redirects"),
            RedirectDecision::Downgrade => {
                attempt.error("refusing to follow a redirect to a less secure URL")
            }
        }
    })
}
