//! Time handling for CF-convention time axes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Units string written for time axes produced by this workspace.
pub const DEFAULT_TIME_UNITS: &str = "hours since 1900-01-01 00:00:00";

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range spanning the earliest and latest of `times`.
    pub fn spanning(times: &[DateTime<Utc>]) -> Option<Self> {
        let start = times.iter().min()?;
        let end = times.iter().max()?;
        Some(Self::new(*start, *end))
    }

    /// Overlap of two ranges, `None` when they are disjoint.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start > end {
            None
        } else {
            Some(TimeRange::new(start, end))
        }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

/// Unit of a CF time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Parse a CF unit word (singular, plural or abbreviated).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }
}

/// Parsed `"<unit> since <reference>"` time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse a CF units attribute.
    ///
    /// Accepts unpadded dates ("days since 1900-1-1"), optional clock time
    /// with fractional seconds ("hours since 1900-01-01 00:00:00.0") and a
    /// trailing `Z`/`UTC` marker.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        let (unit_str, reference_str) = s
            .split_once(" since ")
            .ok_or_else(|| TimeParseError::InvalidUnits(s.to_string()))?;

        let unit = TimeUnit::parse(unit_str)
            .ok_or_else(|| TimeParseError::UnsupportedUnit(unit_str.trim().to_string()))?;
        let reference = parse_reference(reference_str)
            .ok_or_else(|| TimeParseError::InvalidFormat(reference_str.trim().to_string()))?;

        Ok(Self { unit, reference })
    }

    /// Convert an offset value to a timestamp, rounded to the millisecond.
    ///
    /// Non-finite values and offsets beyond chrono's range are rejected.
    pub fn decode(&self, value: f64) -> Result<DateTime<Utc>, TimeParseError> {
        let millis = (value * self.unit.seconds() * 1000.0).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(TimeParseError::OutOfRange(value));
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.reference.checked_add_signed(offset))
            .ok_or(TimeParseError::OutOfRange(value))
    }

    /// Convert a timestamp to an offset value in these units.
    pub fn encode(&self, dt: &DateTime<Utc>) -> f64 {
        let millis = (*dt - self.reference).num_milliseconds() as f64;
        millis / 1000.0 / self.unit.seconds()
    }

    /// Render back to a CF units string.
    pub fn to_units_string(&self) -> String {
        format!(
            "{} since {}",
            self.unit.as_str(),
            self.reference.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl Default for CfTimeUnits {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Hours,
            // 1900-01-01T00:00:00Z
            reference: DateTime::<Utc>::UNIX_EPOCH - Duration::days(25_567),
        }
    }
}

fn parse_reference(s: &str) -> Option<DateTime<Utc>> {
    let cleaned = s
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    let (date_str, time_str) = match cleaned.split_once(|c: char| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (cleaned, None),
    };

    // Fields may be unpadded, so split rather than use a strftime pattern.
    let mut parts = date_str.splitn(3, '-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = match time_str {
        None | Some("") => NaiveTime::from_hms_opt(0, 0, 0)?,
        Some(t) => ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(t, fmt).ok())?,
    };

    Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time units (expected '<unit> since <date>'): {0}")]
    InvalidUnits(String),

    #[error("Unsupported time unit: {0}")]
    UnsupportedUnit(String),

    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time value out of range: {0}")]
    OutOfRange(f64),
}
