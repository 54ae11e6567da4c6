use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Wall-clock start time plus a positive duration.
///
/// The range is carried from ingestion through to display formatting so the
/// `"16:30-17:30"` form published by the directory is parsed exactly once.
/// An end bound at or before the start wraps into the following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TimeRange {
    start: NaiveTime,
    duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeRangeError {
    #[error("time range must not be empty")]
    Empty,
    #[error("time range must be shorter than a day")]
    TooLong,
    #[error("malformed time range '{0}', expected HH:MM-HH:MM")]
    Malformed(String),
}

impl TimeRange {
    pub fn starting_at(start: NaiveTime, duration: Duration) -> Result<Self, TimeRangeError> {
        if duration <= Duration::zero() {
            return Err(TimeRangeError::Empty);
        }
        if duration >= Duration::days(1) {
            return Err(TimeRangeError::TooLong);
        }
        Ok(Self { start, duration })
    }

    pub fn from_bounds(start: NaiveTime, end: NaiveTime) -> Result<Self, TimeRangeError> {
        let mut duration = end.signed_duration_since(start);
        if duration == Duration::zero() {
            return Err(TimeRangeError::Empty);
        }
        if duration < Duration::zero() {
            duration += Duration::days(1);
        }
        Self::starting_at(start, duration)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.start.overflowing_add_signed(self.duration).0
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Whether the range runs past midnight.
    pub fn wraps(&self) -> bool {
        self.end() <= self.start
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_wall_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeRangeError::Malformed(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start = parse_wall_clock(start).ok_or_else(malformed)?;
        let end = parse_wall_clock(end).ok_or_else(malformed)?;
        Self::from_bounds(start, end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end().format("%H:%M")
        )
    }
}

impl From<TimeRange> for String {
    fn from(range: TimeRange) -> Self {
        range.to_string()
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Caller's clock preference for rendering display times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl TimeFormat {
    /// `strftime` pattern for a single wall-clock time.
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "%-I:%M %p",
            TimeFormat::TwentyFourHour => "%H:%M",
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFormat::TwelveHour => f.write_str("12h"),
            TimeFormat::TwentyFourHour => f.write_str("24h"),
        }
    }
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "12h" | "12" => Ok(TimeFormat::TwelveHour),
            "24h" | "24" => Ok(TimeFormat::TwentyFourHour),
            other => Err(format!("unknown time format '{}'", other)),
        }
    }
}

/// A bookable offering, expressed in the directory's reference timezone.
///
/// Immutable once fetched; shared behind an `Arc` by every projection made
/// from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalSlot {
    pub reference_date: NaiveDate,
    pub reference_time_range: TimeRange,
    pub reference_timezone: Tz,
    pub counselor_id: String,
    pub counselor_email: String,
}

impl CanonicalSlot {
    /// Ordering key used wherever slots sharing a local date are listed.
    pub fn reference_order(&self) -> (NaiveDate, NaiveTime) {
        (self.reference_date, self.reference_time_range.start())
    }

    /// Short human-readable identity for log lines and failure messages.
    pub fn describe(&self) -> String {
        format!(
            "{} {} {} ({})",
            self.reference_date,
            self.reference_time_range,
            self.reference_timezone.name(),
            self.counselor_id
        )
    }
}

/// A canonical slot re-expressed in the caller's timezone.
///
/// Derived on every index build and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedSlot {
    pub canonical: Arc<CanonicalSlot>,
    pub local_date: NaiveDate,
    pub local_start: DateTime<Tz>,
    pub local_end: DateTime<Tz>,
    pub display_time: String,
}

impl ConvertedSlot {
    /// The canonical `YYYY-MM-DD` index key.
    pub fn date_key(&self) -> String {
        self.local_date.format("%Y-%m-%d").to_string()
    }
}
