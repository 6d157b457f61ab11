//! Utility functions for text cleanup, date parsing and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging response bodies
//! - HTML stripping for feed descriptions
//! - Publish date parsing for the formats feed services emit
//! - File system validation for the snapshot output directory

use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::Html;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to the nearest
/// character boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Reduce an HTML fragment to its text, collapsing whitespace.
///
/// Feed descriptions are frequently HTML; markup and entity noise would
/// otherwise leak into place extraction.
pub fn strip_html(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    parsed
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a feed publish date.
///
/// Accepts the `YYYY-MM-DD HH:MM:SS` form used by the feed-to-JSON service
/// (interpreted as UTC), RFC 2822 as found in raw RSS, and RFC 3339.
///
/// # Returns
///
/// The instant in UTC, or `None` when no format matches.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // A sync probe keeps the error surface simple
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "ééééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+8 bytes)"));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Congestion at <b>Rotterdam</b>\n terminal</p>"),
            "Congestion at Rotterdam terminal"
        );
        assert_eq!(strip_html("plain text"), "plain text");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_parse_pub_date_feed_service_format() {
        let dt = parse_pub_date("2025-05-06 14:30:00").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 5, 6));
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn test_parse_pub_date_rfc2822() {
        let dt = parse_pub_date("Tue, 06 May 2025 14:30:00 +0200").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_pub_date_rfc3339() {
        assert!(parse_pub_date("2025-05-06T14:30:00Z").is_some());
    }

    #[test]
    fn test_parse_pub_date_garbage() {
        assert_eq!(parse_pub_date("yesterday"), None);
        assert_eq!(parse_pub_date("  "), None);
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("freight_atlas_probe_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        assert!(ensure_writable_dir(&path).await.is_ok());
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
