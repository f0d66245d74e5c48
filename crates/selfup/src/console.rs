use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use selfup_core::{ChangeLog, UpdateStatusListener, VersionEntry};

/// Prints update outcomes for a terminal user and remembers what it saw.
#[derive(Default)]
pub struct ConsoleListener {
    latest: Mutex<Option<VersionEntry>>,
    last_percent: Mutex<Option<u32>>,
    failed: AtomicBool,
}

impl ConsoleListener {
    pub fn latest(&self) -> Option<VersionEntry> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

/// Turn the HTML change notes back into terminal lines.
fn plain_changes(changes: &str) -> String {
    changes
        .split("<br />")
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("  - {}", line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl UpdateStatusListener for ConsoleListener {
    fn on_update_available(&self, changelog: ChangeLog) {
        let Some(entry) = changelog.into_iter().next() else {
            println!("Already up to date.");
            return;
        };

        println!("Version {} is available.", entry.version);
        let changes = plain_changes(&entry.changes);
        if !changes.is_empty() {
            println!("{changes}");
        }
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn on_update_download_progress(&self, percent: f32) {
        let whole = percent.clamp(0.0, 100.0) as u32;
        let mut last = self
            .last_percent
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last != Some(whole) {
            *last = Some(whole);
            println!("Downloading... {whole}%");
        }
    }

    fn on_update_download_finished(&self) {
        info!("Download finished");
        println!("Download finished, installing.");
    }

    fn on_update_error(&self, message: String) {
        self.failed.store(true, Ordering::Release);
        eprintln!("error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use selfup_core::{UpdateStatusListener, VersionEntry};

    use super::{ConsoleListener, plain_changes};

    #[test]
    fn plain_changes_lists_each_line() {
        assert_eq!(
            plain_changes("<br />Faster startup<br />Fixed crash"),
            "  - Faster startup\n  - Fixed crash"
        );
        assert_eq!(plain_changes(""), "");
    }

    #[test]
    fn remembers_the_offered_version() {
        let listener = ConsoleListener::default();
        let entry = VersionEntry {
            version: "2023.02.15".to_string(),
            changes: String::new(),
            update_url: "https://x/y.exe".to_string(),
        };

        listener.on_update_available(vec![entry.clone()]);

        assert_eq!(listener.latest(), Some(entry));
        assert!(!listener.failed());
    }

    #[test]
    fn empty_changelog_leaves_nothing_to_install() {
        let listener = ConsoleListener::default();

        listener.on_update_available(Vec::new());

        assert_eq!(listener.latest(), None);
    }

    #[test]
    fn errors_are_remembered() {
        let listener = ConsoleListener::default();

        listener.on_update_error("No data downloaded.".to_string());

        assert!(listener.failed());
    }
}
