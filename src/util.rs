use std::time::Duration;

use chrono::{Local, TimeZone};

use crate::error::{HoardError, Result};

/// Local wall-clock time for an epoch-millis timestamp.
pub fn format_timestamp(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// "3m 12s ago" style age, to whole seconds.
pub fn format_ago(now: i64, then: i64) -> String {
    let secs = u64::try_from(now.saturating_sub(then) / 1000).unwrap_or(0);
    if secs == 0 {
        return "just now".to_string();
    }
    format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
}

/// Parses config durations like "5s", "1m 30s", "500ms".
pub fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value.trim())
        .map_err(|e| HoardError::Config(format!("{field}: '{value}': {e}")))?;
    if duration.is_zero() {
        return Err(HoardError::Config(format!("{field}: must be greater than zero")));
    }
    Ok(duration)
}

pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
