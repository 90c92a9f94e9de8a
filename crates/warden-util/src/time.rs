//! Time utilities for warden
//!
//! Two concerns live here:
//! - The time resolver: `TimeSpec` parses the duration (`30m`, `1h59m`, `1d`)
//!   and daily interval (`10h-18h`) strings that policy entries carry.
//! - Wall-clock access, with mock time support for development.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `WARDEN_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is
//! useful for testing interval entries without waiting for the clock.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! ```bash
//! WARDEN_MOCK_TIME="2025-12-25 14:30:00" wardend
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "WARDEN_MOCK_TIME";

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => match Local.from_local_datetime(&naive_dt).single() {
                        Some(mock_dt) => {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        None => tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        ),
                    },
                    Err(_) => tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    ),
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Current time as epoch seconds, the unit policy timeouts are stored in.
pub fn now_epoch() -> i64 {
    now().timestamp()
}

/// Convert epoch seconds to local time. `None` if out of chrono's range.
pub fn local_datetime(epoch_seconds: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.with_timezone(&Local))
}

/// Error produced by the time resolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSpecError {
    #[error("Invalid time format '{value}': {message}")]
    InvalidFormat { value: String, message: String },
}

impl TimeSpecError {
    fn invalid(value: &str, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// A classified time specification.
///
/// `Duration` specs are offsets from "now" that turn into an absolute
/// timeout when an entry is created. `Interval` specs are recurring daily
/// windows `[start_hour, end_hour)` in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSpec {
    Duration { seconds: u64 },
    Interval { start_hour: u8, end_hour: u8 },
}

impl TimeSpec {
    pub fn is_interval(&self) -> bool {
        matches!(self, TimeSpec::Interval { .. })
    }

    /// Whether an entry carrying this spec applies at `dt`.
    ///
    /// Durations are consumed at creation time (they become the entry's
    /// timeout), so they never restrict applicability. Wrap-around and empty
    /// intervals (`end <= start`) are unsupported and never active.
    pub fn is_active_at(&self, dt: &DateTime<Local>) -> bool {
        match *self {
            TimeSpec::Duration { .. } => true,
            TimeSpec::Interval {
                start_hour,
                end_hour,
            } => {
                let hour = dt.hour() as u8;
                start_hour < end_hour && hour >= start_hour && hour < end_hour
            }
        }
    }

    /// Absolute expiry for a duration spec created at `now`
    pub fn timeout_from(&self, now: i64) -> Option<i64> {
        match *self {
            TimeSpec::Duration { seconds } => {
                i64::try_from(seconds).ok().and_then(|s| now.checked_add(s))
            }
            TimeSpec::Interval { .. } => None,
        }
    }
}

impl FromStr for TimeSpec {
    type Err = TimeSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        classify(s)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimeSpec::Interval {
                start_hour,
                end_hour,
            } => write!(f, "{}h-{}h", start_hour, end_hour),
            TimeSpec::Duration { seconds } => {
                let days = seconds / SECONDS_PER_DAY;
                let hours = (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
                let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

                if seconds == 0 {
                    return write!(f, "0m");
                }
                if days > 0 {
                    write!(f, "{}d", days)?;
                }
                if hours > 0 {
                    write!(f, "{}h", hours)?;
                }
                if minutes > 0 {
                    write!(f, "{}m", minutes)?;
                }
                Ok(())
            }
        }
    }
}

/// Classify a time spec string.
///
/// Anything containing `-` must be an interval `"<start>h-<end>h"` with both
/// hours in 0..=23. Everything else must be a duration built from `<n>d`,
/// `<n>h` and `<n>m` tokens, in that order, each at most once.
pub fn classify(spec: &str) -> Result<TimeSpec, TimeSpecError> {
    if spec.contains('-') {
        parse_interval(spec)
    } else {
        parse_duration(spec).map(|seconds| TimeSpec::Duration { seconds })
    }
}

/// Resolve a duration spec into an absolute epoch-seconds timeout.
pub fn resolve_timeout(spec: &str, now: i64) -> Result<i64, TimeSpecError> {
    match classify(spec)? {
        duration @ TimeSpec::Duration { .. } => duration
            .timeout_from(now)
            .ok_or_else(|| TimeSpecError::invalid(spec, "duration overflows timestamp")),
        TimeSpec::Interval { .. } => Err(TimeSpecError::invalid(
            spec,
            "expected a duration, got an interval",
        )),
    }
}

/// Whether the local hour of `now` falls inside an interval spec.
pub fn is_within_interval(spec: &str, now: i64) -> Result<bool, TimeSpecError> {
    let interval = classify(spec)?;
    if !interval.is_interval() {
        return Err(TimeSpecError::invalid(
            spec,
            "expected an interval, got a duration",
        ));
    }

    let dt = local_datetime(now)
        .ok_or_else(|| TimeSpecError::invalid(spec, "timestamp out of range"))?;
    Ok(interval.is_active_at(&dt))
}

fn parse_interval(spec: &str) -> Result<TimeSpec, TimeSpecError> {
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| TimeSpecError::invalid(spec, "expected <start>h-<end>h"))?;

    let start_hour = parse_hour(start).map_err(|m| TimeSpecError::invalid(spec, m))?;
    let end_hour = parse_hour(end).map_err(|m| TimeSpecError::invalid(spec, m))?;

    Ok(TimeSpec::Interval {
        start_hour,
        end_hour,
    })
}

fn parse_hour(s: &str) -> Result<u8, String> {
    let digits = s
        .strip_suffix('h')
        .ok_or_else(|| format!("'{}' must end with 'h'", s))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not an hour", s));
    }

    let hour: u8 = digits
        .parse()
        .map_err(|_| format!("'{}' is not an hour", s))?;
    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    Ok(hour)
}

fn parse_duration(spec: &str) -> Result<u64, TimeSpecError> {
    if spec.is_empty() {
        return Err(TimeSpecError::invalid(spec, "empty duration"));
    }

    let mut rest = spec;
    let mut last_rank = 0;
    let mut total: u64 = 0;

    while !rest.is_empty() {
        let digit_len = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digit_len == 0 {
            return Err(TimeSpecError::invalid(spec, "expected a number"));
        }

        let (number, tail) = rest.split_at(digit_len);
        let (rank, factor) = match tail.chars().next() {
            Some('d') => (1, SECONDS_PER_DAY),
            Some('h') => (2, SECONDS_PER_HOUR),
            Some('m') => (3, SECONDS_PER_MINUTE),
            Some(other) => {
                return Err(TimeSpecError::invalid(
                    spec,
                    format!("unknown unit '{}'", other),
                ));
            }
            None => return Err(TimeSpecError::invalid(spec, "missing unit after number")),
        };

        if rank <= last_rank {
            return Err(TimeSpecError::invalid(
                spec,
                "units must appear at most once, in d, h, m order",
            ));
        }
        last_rank = rank;

        let amount: u64 = number
            .parse()
            .map_err(|_| TimeSpecError::invalid(spec, "number too large"))?;
        total = amount
            .checked_mul(factor)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| TimeSpecError::invalid(spec, "duration too large"))?;

        // Unit characters are ASCII, so this stays on a char boundary.
        rest = &tail[1..];
    }

    Ok(total)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn local_epoch(hour: u32) -> i64 {
        Local
            .with_ymd_and_hms(2025, 6, 18, hour, 30, 0)
            .unwrap()
            .timestamp()
    }

    #[test]
    fn test_classify_durations() {
        assert_eq!(classify("30m").unwrap(), TimeSpec::Duration { seconds: 1800 });
        assert_eq!(classify("1h59m").unwrap(), TimeSpec::Duration { seconds: 7140 });
        assert_eq!(classify("1d").unwrap(), TimeSpec::Duration { seconds: 86400 });
        assert_eq!(
            classify("2d3h4m").unwrap(),
            TimeSpec::Duration {
                seconds: 2 * 86400 + 3 * 3600 + 4 * 60
            }
        );
    }

    #[test]
    fn test_classify_rejects_malformed() {
        for bad in ["", "h", "10", "10s", "1m1h", "1h1h", "1.5h", " 1h", "abc", "1h 2m"] {
            assert!(classify(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn test_classify_intervals() {
        assert_eq!(
            classify("10h-18h").unwrap(),
            TimeSpec::Interval {
                start_hour: 10,
                end_hour: 18
            }
        );

        for bad in ["10-18", "10h-24h", "h-2h", "1h-2h-3h", "-5m", "10h-"] {
            assert!(classify(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn test_every_hour_pair_is_an_interval() {
        for start in 0..24 {
            for end in 0..24 {
                let spec = format!("{}h-{}h", start, end);
                let parsed = classify(&spec).unwrap();
                assert!(parsed.is_interval(), "{} classified as {:?}", spec, parsed);
                assert_eq!(parsed.to_string(), spec);
            }
        }
    }

    #[test]
    fn test_resolve_timeout() {
        assert_eq!(resolve_timeout("1h59m", 1704063600).unwrap(), 1704070740);
        assert_eq!(resolve_timeout("30m", 0).unwrap(), 1800);
        assert_eq!(resolve_timeout("1d", 100).unwrap(), 86500);
    }

    #[test]
    fn test_resolve_timeout_rejects_intervals() {
        assert!(matches!(
            resolve_timeout("10h-18h", 0),
            Err(TimeSpecError::InvalidFormat { .. })
        ));
        assert!(resolve_timeout("soon", 0).is_err());
    }

    #[test]
    fn test_is_within_interval() {
        assert!(is_within_interval("10h-18h", local_epoch(10)).unwrap());
        assert!(is_within_interval("10h-18h", local_epoch(17)).unwrap());
        assert!(!is_within_interval("10h-18h", local_epoch(18)).unwrap());
        assert!(!is_within_interval("10h-18h", local_epoch(9)).unwrap());
    }

    #[test]
    fn test_wrap_around_interval_is_never_active() {
        for hour in 0..24 {
            assert!(!is_within_interval("22h-6h", local_epoch(hour)).unwrap());
        }
        assert!(!is_within_interval("5h-5h", local_epoch(5)).unwrap());
    }

    #[test]
    fn test_is_within_interval_rejects_durations() {
        assert!(is_within_interval("30m", local_epoch(12)).is_err());
    }

    #[test]
    fn test_duration_display_is_canonical() {
        assert_eq!(TimeSpec::Duration { seconds: 7140 }.to_string(), "1h59m");
        assert_eq!(TimeSpec::Duration { seconds: 86400 }.to_string(), "1d");
        assert_eq!(TimeSpec::Duration { seconds: 0 }.to_string(), "0m");
    }

    #[test]
    fn test_durations_are_always_active() {
        let dt = Local.with_ymd_and_hms(2025, 6, 18, 3, 0, 0).unwrap();
        assert!(TimeSpec::Duration { seconds: 60 }.is_active_at(&dt));
    }

    #[test]
    fn test_local_datetime_roundtrip() {
        let epoch = local_epoch(14);
        let dt = local_datetime(epoch).unwrap();
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.day(), 18);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
        assert!((now_epoch() - t.timestamp()).abs() <= 1);
    }

    #[test]
    fn test_mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "WARDEN_MOCK_TIME");
    }
}
