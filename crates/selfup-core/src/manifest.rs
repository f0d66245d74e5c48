//! Update manifest model.
//!
//! The manifest is a JSON object keyed by OS name. Each section names the
//! latest build for that OS:
//!
//! ```json
//! { "Windows": { "version": "2023.02.15", "url": "https://host/app.exe", "changelog": "Fixes\nMore fixes" } }
//! ```
//!
//! Sections for other platforms, or sections missing `version`/`url`, are not
//! errors. They simply mean there is no update for this build.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UpdateError;

/// `yyyy.MM.dd`, the calendar format every version string uses.
pub const VERSION_FORMAT: &str = "%Y.%m.%d";

const LINE_BREAK: &str = "<br />";

/// One published build newer than the running one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    /// Change notes as HTML, empty when the manifest has none.
    pub changes: String,
    pub update_url: String,
}

/// Newer builds in discovery order. Empty means no update is available.
pub type ChangeLog = Vec<VersionEntry>;

/// Evaluate a downloaded manifest body for the OS section `os_key`.
///
/// # Errors
/// Returns [`UpdateError::EmptyResponse`] when `body` is empty. Every other
/// body yields a changelog, empty unless the section describes a build dated
/// strictly after `current_version`.
pub fn evaluate_manifest(
    body: &[u8],
    os_key: &str,
    current_version: &str,
) -> Result<ChangeLog, UpdateError> {
    if body.is_empty() {
        return Err(UpdateError::EmptyResponse);
    }

    let root = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(root)) => root,
        Ok(_) => {
            debug!("Manifest root is not an object, treating as no update");
            return Ok(ChangeLog::new());
        }
        Err(error) => {
            debug!("Manifest is not valid JSON ({error}), treating as no update");
            return Ok(ChangeLog::new());
        }
    };

    let Some(section) = root.get(os_key).and_then(Value::as_object) else {
        debug!("Manifest has no usable '{os_key}' section");
        return Ok(ChangeLog::new());
    };

    let Some(entry) = entry_from_section(section) else {
        debug!("Manifest section '{os_key}' lacks a string version or url");
        return Ok(ChangeLog::new());
    };

    if is_newer_version(&entry.version, current_version) {
        Ok(vec![entry])
    } else {
        debug!(
            "Published version {} is not newer than {current_version}",
            entry.version
        );
        Ok(ChangeLog::new())
    }
}

fn entry_from_section(section: &Map<String, Value>) -> Option<VersionEntry> {
    let version = section.get("version")?.as_str()?;
    let update_url = section.get("url")?.as_str()?;
    let changes = section
        .get("changelog")
        .and_then(Value::as_str)
        .map(render_changelog)
        .unwrap_or_default();

    Some(VersionEntry {
        version: version.to_string(),
        changes,
        update_url: update_url.to_string(),
    })
}

/// Render plain-text change notes as HTML, one line break per newline.
///
/// A leading break separates the notes from whatever heading the UI shows
/// above them.
#[must_use]
pub fn render_changelog(text: &str) -> String {
    format!("{LINE_BREAK}{}", text.replace('\n', LINE_BREAK))
}

/// Parse a `yyyy.MM.dd` version string.
///
/// Only the exact zero-padded form is accepted: `2023.2.5`, `1.2.3` and
/// strings with surrounding whitespace or a sign are not dates.
#[must_use]
pub fn parse_version_date(version: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(version, VERSION_FORMAT)
        .ok()
        .filter(|date| date.format(VERSION_FORMAT).to_string() == version)
}

/// Whether `remote` is dated strictly after `current`.
///
/// If either side is not a valid date the answer is `false`: a build the
/// updater cannot order is never offered.
#[must_use]
pub fn is_newer_version(remote: &str, current: &str) -> bool {
    match (parse_version_date(remote), parse_version_date(current)) {
        (Some(remote), Some(current)) => remote > current,
        (remote_date, current_date) => {
            if remote_date.is_none() {
                warn!("Ignoring published version with unparsable date '{remote}'");
            }
            if current_date.is_none() {
                warn!("Current version '{current}' is not a valid date, skipping update");
            }
            false
        }
    }
}
