//! Utility functions for string handling, URL labels and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Character-safe truncation for logging and size caps
//! - Source labels derived from article URLs
//! - JSON error classification for gateway output
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::models::UNKNOWN_SOURCE;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the
/// number of dropped bytes appended. Cuts always land on a character
/// boundary.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// The original string if it has at most `max` characters, otherwise the
/// first `max` characters with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Keep at most `max` characters of `s`.
///
/// # Arguments
///
/// * `s` - The string to cap
/// * `max` - Maximum number of characters to keep
///
/// # Returns
///
/// A prefix of `s` ending on a character boundary. Nothing is appended.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        None => s,
        Some((cut, _)) => &s[..cut],
    }
}

/// Host of `url` with a leading `www.` removed.
///
/// # Arguments
///
/// * `url` - An absolute URL
///
/// # Returns
///
/// `Some(host)` such as `news.example.com`, or `None` when `url` does not
/// parse or has no host.
pub fn host_without_www(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Publisher label for a URL: the domain label just before the TLD.
///
/// `https://www.example.com/a` gives `example`, `https://lite.cnn.com/x`
/// gives `cnn`.
///
/// # Arguments
///
/// * `url` - The article URL
///
/// # Returns
///
/// The label before the TLD. Single-label hosts such as `localhost` are
/// returned whole, and anything that does not parse as a URL is labelled
/// `Unknown`.
pub fn source_from_url(url: &str) -> String {
    let Some(host) = host_without_www(url) else {
        return UNKNOWN_SOURCE.to_string();
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2].to_string()
    } else {
        host
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// Gateway output that was cut off mid-object fails with an EOF error,
/// which is worth distinguishing from plain garbage in the logs.
///
/// # Arguments
///
/// * `e` - The serde_json error to classify
///
/// # Returns
///
/// `true` if the error is an EOF error, `false` otherwise.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Arguments
///
/// * `path` - Path to the directory to validate
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The probe file cannot be created (permission denied, read-only filesystem)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
