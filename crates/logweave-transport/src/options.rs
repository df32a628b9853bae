use std::time::{SystemTime, UNIX_EPOCH};

use bollard::container::LogsOptions as LogsQuery;
use chrono::{DateTime, NaiveDate};

use crate::error::{Result, TransportError};

/// Docker Engine endpoint used when `DOCKER_HOST` is unset.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Which part of a source's output to stream.
///
/// Defaults: both substreams, no time bounds, timestamps on, follow on,
/// last 10 records, details off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsOptions {
    /// Include the primary (stdout) substream.
    pub show_stdout: bool,
    /// Include the secondary (stderr) substream.
    pub show_stderr: bool,
    /// Only records after this point (timestamp or relative duration). Empty means unbounded.
    pub since: String,
    /// Only records before this point. Empty means unbounded.
    pub until: String,
    /// Prefix every record with its timestamp.
    pub timestamps: bool,
    /// Keep the stream open and deliver new records as they are produced.
    pub follow: bool,
    /// Number of historical records to replay, or `all`.
    pub tail: String,
    /// Include extra attributes attached to each record.
    pub details: bool,
}

impl Default for LogsOptions {
    fn default() -> Self {
        Self {
            show_stdout: true,
            show_stderr: true,
            since: String::new(),
            until: String::new(),
            timestamps: true,
            follow: true,
            tail: "10".to_string(),
            details: false,
        }
    }
}

impl LogsOptions {
    /// Engine query for these options. Time bounds are resolved against `now`;
    /// an empty tail replays the whole history.
    pub fn to_query(&self, now: SystemTime) -> Result<LogsQuery<String>> {
        let tail = if self.tail.is_empty() {
            "all".to_string()
        } else {
            self.tail.clone()
        };
        Ok(LogsQuery {
            follow: self.follow,
            stdout: self.show_stdout,
            stderr: self.show_stderr,
            since: parse_time_bound(&self.since, now)?,
            until: parse_time_bound(&self.until, now)?,
            timestamps: self.timestamps,
            tail,
        })
    }
}

/// Resolve a `since`/`until` bound to Unix seconds.
///
/// Accepts Unix seconds (`1700000000`, `1700000000.5`), RFC 3339 timestamps,
/// plain dates (`2024-01-31`, midnight UTC) and durations relative to `now`
/// (`10m`, `1h 30m`). An empty value means unbounded and resolves to 0.
pub fn parse_time_bound(value: &str, now: SystemTime) -> Result<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }

    let (whole, fraction) = value.split_once('.').unwrap_or((value, "0"));
    if fraction.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(secs) = whole.parse::<i64>() {
            return Ok(secs);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.timestamp());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }

    if let Ok(ago) = humantime::parse_duration(value) {
        let at = now.checked_sub(ago).unwrap_or(UNIX_EPOCH);
        let secs = at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        return Ok(i64::try_from(secs).unwrap_or(i64::MAX));
    }

    Err(TransportError::InvalidRequest(format!(
        "cannot parse time bound {value:?}"
    )))
}
