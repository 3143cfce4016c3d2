// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock context used to stamp and render memory records.
//!
//! Everything here is total: bad timestamps render as sentinel strings
//! instead of errors, so a malformed stored value can never break a turn.

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

/// Seconds at 2100-01-01T00:00:00Z; timestamps past this are rejected.
const MAX_REASONABLE_SECS: i64 = 4_102_444_800;

/// Timestamps larger than this are assumed to be milliseconds.
const MS_DETECTION_FLOOR: i64 = 10_000_000_000;

/// A structured snapshot of the current time in one timezone.
///
/// All fields are derived from a single `now()` call so they are
/// mutually consistent.
#[derive(Debug, Clone, Serialize)]
pub struct TimeContext {
    /// `%Y-%m-%d %H:%M:%S %Z`.
    pub current_time: String,
    /// `%Y-%m-%d`.
    pub date: String,
    /// `%H:%M:%S`.
    pub time: String,
    /// IANA zone name.
    pub timezone: String,
    /// Full weekday name.
    pub weekday: String,
    /// Full month name.
    pub month: String,
    pub year: i32,
    pub hour: u32,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Renders current time and stored timestamps in a configured timezone.
#[derive(Debug, Clone)]
pub struct TimeProvider {
    tz: Tz,
}

impl TimeProvider {
    /// Creates a provider for the named IANA timezone.
    ///
    /// Unknown names degrade to UTC with a warning rather than failing.
    pub fn new(timezone: &str) -> Self {
        let tz = match timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(timezone, "unknown timezone, falling back to UTC");
                Tz::UTC
            }
        };
        Self { tz }
    }

    /// The effective zone name (after any UTC fallback).
    pub fn timezone_name(&self) -> String {
        self.tz.name().to_string()
    }

    /// Snapshot the current time into a [`TimeContext`].
    pub fn now_context(&self) -> TimeContext {
        use chrono::{Datelike, Timelike};
        let now = Utc::now().with_timezone(&self.tz);
        TimeContext {
            current_time: now.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            timezone: self.tz.name().to_string(),
            weekday: now.format("%A").to_string(),
            month: now.format("%B").to_string(),
            year: now.year(),
            hour: now.hour(),
            timestamp: now.timestamp(),
        }
    }

    /// Render an epoch value as a human string. Total: never panics,
    /// never errors.
    ///
    /// Accepts seconds or milliseconds, auto-detected by magnitude
    /// (values above 1e10 are treated as milliseconds). Values outside
    /// epoch-0..year-2100 yield sentinel strings.
    pub fn format_timestamp(&self, timestamp: i64) -> String {
        if timestamp <= 0 {
            return "time unknown".to_string();
        }

        let secs = if timestamp > MS_DETECTION_FLOOR {
            timestamp / 1000
        } else {
            timestamp
        };

        if secs > MAX_REASONABLE_SECS {
            return "time out of range".to_string();
        }

        match self.tz.timestamp_opt(secs, 0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
            None => "time invalid".to_string(),
        }
    }

    /// True when [`format_timestamp`](Self::format_timestamp) would
    /// produce a real time rather than a sentinel.
    pub fn validate_timestamp(&self, timestamp: i64) -> bool {
        if timestamp <= 0 {
            return false;
        }
        let secs = if timestamp > MS_DETECTION_FLOOR {
            timestamp / 1000
        } else {
            timestamp
        };
        secs <= MAX_REASONABLE_SECS && self.tz.timestamp_opt(secs, 0).single().is_some()
    }
}
