//! Candidate assignments.
//!
//! A candidate is one feasible (coach, branch, level, day, timeslot)
//! opportunity. Candidates are produced by a data-preparation step (see
//! [`crate::generation`]) already filtered for coach qualification and
//! availability; the scheduler only decides which of them to commit.

use serde::{Deserialize, Serialize};

use super::{ClockTime, Day, Interval, Period, RequirementKey};

/// A schedulable opportunity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique candidate identifier.
    pub id: u32,
    /// Coach who would teach the class.
    pub coach_id: String,
    pub branch: String,
    pub level: String,
    pub day: Day,
    pub start: ClockTime,
    pub end: ClockTime,
    /// Class length in minutes.
    pub duration_minutes: u32,
    /// Availability period the class starts in.
    pub period: Period,
    /// Whether the slot falls in a historically high-demand window.
    #[serde(default)]
    pub is_popular: bool,
    /// Maximum students for the level.
    pub capacity: u32,
}

impl Candidate {
    /// Creates a candidate; the period and duration are derived from the times.
    pub fn new(
        id: u32,
        coach_id: impl Into<String>,
        branch: impl Into<String>,
        level: impl Into<String>,
        day: Day,
        start: ClockTime,
        end: ClockTime,
    ) -> Self {
        Self {
            id,
            coach_id: coach_id.into(),
            branch: branch.into(),
            level: level.into(),
            day,
            start,
            end,
            duration_minutes: end.minutes().saturating_sub(start.minutes()),
            period: start.period(),
            is_popular: false,
            capacity: crate::models::DEFAULT_LEVEL_CAPACITY,
        }
    }

    /// Sets the popularity flag.
    pub fn with_popular(mut self, popular: bool) -> Self {
        self.is_popular = popular;
        self
    }

    /// Sets the class capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// The [start, end) interval.
    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    /// The (branch, level) this candidate serves.
    pub fn requirement_key(&self) -> RequirementKey {
        RequirementKey::new(&self.branch, &self.level)
    }

    /// Whether this candidate serves the given (branch, level).
    pub fn serves(&self, branch: &str, level: &str) -> bool {
        self.branch == branch && self.level == level
    }
}
