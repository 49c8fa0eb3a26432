//! Utility functions for time windows, logging and the file system.
//!
//! - Start of the local day for the "today" read window
//! - String truncation for log fields
//! - Database directory creation before the pool connects

use chrono::{DateTime, NaiveTime, Offset, TimeZone, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Midnight of the day `now` falls in, in `now`'s time zone, as UTC.
///
/// If that midnight does not exist locally (a DST jump at 00:00), the
/// current UTC offset is applied to the naive midnight instead.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        None => (midnight - now.offset().fix()).and_utc(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and get a `"…(+N bytes)"`
/// suffix.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// File path of a SQLite connection URL, `None` for in-memory databases.
pub fn database_path(database_url: &str) -> Option<&str> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}

/// Create the directory a file database lives in.
///
/// # Errors
///
/// Returns an error if the directory cannot be created (permission denied,
/// read-only file system, a file in the way, ...).
#[instrument(level = "info", skip_all, fields(%database_url))]
pub async fn ensure_database_dir(database_url: &str) -> std::io::Result<()> {
    let Some(path) = database_path(database_url) else {
        return Ok(());
    };
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
        info!(dir = %parent.display(), "Database directory ready");
    }
    Ok(())
}
