//! Time primitives: clock times, weekdays, day periods and intervals.
//!
//! # Time Model
//! A timetable repeats weekly, so times are wall-clock minutes since
//! midnight within a single [`Day`]. On the wire a [`ClockTime`] is an
//! `HH:MM` string.
//!
//! # Intervals
//! [`Interval`] is half-open: it includes its start and excludes its end,
//! so a class ending at 10:00 does not overlap one starting at 10:00.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Wall-clock time of day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

/// Error returned when an `HH:MM` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid clock time '{input}': expected HH:MM between 00:00 and 23:59")]
pub struct TimeParseError {
    input: String,
}

impl ClockTime {
    /// Midnight (00:00).
    pub const MIDNIGHT: Self = Self(0);

    /// Creates a clock time from hours and minutes.
    ///
    /// Returns `None` when `hour >= 24` or `minute >= 60`.
    pub fn new(hour: u16, minute: u16) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    /// Creates a clock time from minutes since midnight.
    ///
    /// Returns `None` past 23:59.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes >= 24 * 60 {
            return None;
        }
        Some(Self(minutes as u16))
    }

    /// Minutes since midnight.
    #[inline]
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    /// Hour component (0..=23).
    #[inline]
    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    /// Minute component (0..=59).
    #[inline]
    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    /// Adds minutes, returning `None` if the result passes midnight.
    pub fn add_minutes(self, minutes: u32) -> Option<Self> {
        Self::from_minutes(self.minutes() + minutes)
    }

    /// The period of day this time falls in (morning before noon).
    pub fn period(self) -> Period {
        if self.hour() < 12 {
            Period::Morning
        } else {
            Period::Afternoon
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError {
            input: s.to_string(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;
        let hour: u16 = h.parse().map_err(|_| err())?;
        let minute: u16 = m.parse().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Day of the week.
///
/// Ordering follows the calendar (Monday first), which is also the
/// output ordering of schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    /// All days in calendar order.
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    /// Three-letter uppercase code (`"TUE"`).
    pub fn code(self) -> &'static str {
        match self {
            Day::Mon => "MON",
            Day::Tue => "TUE",
            Day::Wed => "WED",
            Day::Thu => "THU",
            Day::Fri => "FRI",
            Day::Sat => "SAT",
            Day::Sun => "SUN",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a day counts as a weekday or a weekend day for workload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Weekend,
}

/// Half of an operating day, used for coach availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "am", alias = "morning")]
    Morning,
    #[serde(rename = "pm", alias = "afternoon")]
    Afternoon,
}

/// A time interval [start, end) within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Interval start (inclusive).
    pub start: ClockTime,
    /// Interval end (exclusive).
    pub end: ClockTime,
}

impl Interval {
    /// Creates a new interval.
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Length in minutes (0 for inverted intervals).
    #[inline]
    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Whether a time falls within this interval.
    #[inline]
    pub fn contains(&self, time: ClockTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether two intervals overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this interval.
    pub fn covers(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Signed idle minutes between two intervals, whichever comes first.
    ///
    /// Negative when they overlap.
    pub fn gap_minutes(&self, other: &Self) -> i64 {
        if self.start <= other.start {
            i64::from(other.start.minutes()) - i64::from(self.end.minutes())
        } else {
            i64::from(self.start.minutes()) - i64::from(other.end.minutes())
        }
    }

    /// Indices of the 30-minute grid cells touched by this interval.
    ///
    /// Cell `k` covers `[k*30, (k+1)*30)` minutes since midnight.
    pub fn half_hour_cells(&self) -> std::ops::Range<u32> {
        if self.end <= self.start {
            return 0..0;
        }
        let first = self.start.minutes() / 30;
        let last = (self.end.minutes() - 1) / 30;
        first..last + 1
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
