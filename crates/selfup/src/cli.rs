use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "selfup",
    version,
    about = "Check for, download, and install application updates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Manifest to query (overrides the settings file).
    #[arg(long = "manifest-url", value_name = "URL", global = true)]
    pub manifest_url: Option<String>,

    /// Version of the running build, yyyy.MM.dd (overrides the settings file).
    #[arg(long = "current-version", value_name = "VERSION", global = true)]
    pub current_version: Option<String>,

    /// Application name used for the download file and bundle lookup.
    #[arg(long = "app-name", value_name = "NAME", global = true)]
    pub app_name: Option<String>,

    /// Write debug logs to the terminal and log file.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask the manifest whether a newer build exists.
    Check,

    /// Download and install the newest build, then quit.
    Update {
        /// Install from this URL instead of the one the manifest publishes.
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
}
