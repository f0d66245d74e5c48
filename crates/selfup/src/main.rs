//! Command-line host for the self-updater.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use selfup_core::AutoUpdater;
use selfup_core::installer::cleanup_old_app_bundle;
use selfup_platform::AppPaths;

mod cli;
mod console;
mod logging;
mod settings;

use crate::cli::{Cli, Command};
use crate::console::ConsoleListener;
use crate::settings::AppSettings;

const APP_DIR_NAME: &str = "selfup";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::new(APP_DIR_NAME) {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = paths.ensure_dirs() {
        eprintln!("warning: failed to create application directories: {error}");
    }

    let settings_path = paths.settings_file();
    let mut settings = AppSettings::load(&settings_path);
    if !settings_path.exists()
        && let Err(error) = settings.save(&settings_path)
    {
        eprintln!("warning: {error}");
    }
    settings.apply_cli(&cli);

    logging::init_logging(
        &paths.log_file(),
        settings.debug_logging,
        settings.max_log_size_bytes,
    );
    cleanup_old_app_bundle();

    let listener = Arc::new(ConsoleListener::default());
    let updater = match AutoUpdater::new(settings.updater, listener.clone()) {
        Ok(updater) => updater,
        Err(err) => {
            error!("Invalid updater configuration: {err}");
            eprintln!("error: {err} (configure it in {})", settings_path.display());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Check => updater.check_for_updates().await,
        Command::Update { url } => {
            let url = match url {
                Some(url) => Some(url),
                None => {
                    updater.check_for_updates().await;
                    listener.latest().map(|entry| entry.update_url)
                }
            };

            if let Some(url) = url {
                info!("Installing update from {url}");
                updater.download_and_install_update(&url).await;
            }
        }
    }

    if listener.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
