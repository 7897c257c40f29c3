//! Coach model.
//!
//! Coaches are the human resources of a timetable. Each coach has an
//! employment status (which sets the weekly class cap), the levels they
//! are qualified to teach, the branches they may work at, and a weekly
//! morning/afternoon availability map.
//!
//! Coaches are immutable inputs for a scheduling run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{Day, Period};

/// A coach who can be assigned to classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coach {
    /// Unique coach identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Employment status; determines the weekly class cap.
    pub status: EmploymentStatus,
    /// Levels this coach may teach.
    #[serde(default)]
    pub qualifications: BTreeSet<String>,
    /// Branches this coach may work at.
    #[serde(default)]
    pub branches: BTreeSet<String>,
    /// Availability per day. Days absent from the map are unavailable.
    #[serde(default)]
    pub availability: BTreeMap<Day, DayAvailability>,
}

/// Employment status of a coach.
///
/// Ordering is the assignment preference: full-time coaches are tried
/// before part-time coaches, branch managers last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmploymentStatus {
    #[serde(alias = "Full Time")]
    FullTime,
    #[serde(alias = "Part Time")]
    PartTime,
    #[serde(alias = "Branch Manager")]
    BranchManager,
}

impl EmploymentStatus {
    /// All statuses in assignment-preference order.
    pub const ALL: [EmploymentStatus; 3] = [
        EmploymentStatus::FullTime,
        EmploymentStatus::PartTime,
        EmploymentStatus::BranchManager,
    ];
}

/// Morning/afternoon availability for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    #[serde(default, alias = "am")]
    pub morning: bool,
    #[serde(default, alias = "pm")]
    pub afternoon: bool,
}

impl DayAvailability {
    /// Available all day.
    pub const FULL: Self = Self {
        morning: true,
        afternoon: true,
    };

    /// Whether the given period is available.
    pub fn allows(&self, period: Period) -> bool {
        match period {
            Period::Morning => self.morning,
            Period::Afternoon => self.afternoon,
        }
    }
}

impl Coach {
    /// Creates a coach with no qualifications, branches or availability.
    pub fn new(id: impl Into<String>, status: EmploymentStatus) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            status,
            qualifications: BTreeSet::new(),
            branches: BTreeSet::new(),
            availability: BTreeMap::new(),
        }
    }

    /// Creates a full-time coach.
    pub fn full_time(id: impl Into<String>) -> Self {
        Self::new(id, EmploymentStatus::FullTime)
    }

    /// Creates a part-time coach.
    pub fn part_time(id: impl Into<String>) -> Self {
        Self::new(id, EmploymentStatus::PartTime)
    }

    /// Creates a branch manager.
    pub fn branch_manager(id: impl Into<String>) -> Self {
        Self::new(id, EmploymentStatus::BranchManager)
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a level qualification.
    pub fn with_qualification(mut self, level: impl Into<String>) -> Self {
        self.qualifications.insert(level.into());
        self
    }

    /// Adds a branch assignment.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branches.insert(branch.into());
        self
    }

    /// Sets availability for a day.
    pub fn with_availability(mut self, day: Day, availability: DayAvailability) -> Self {
        self.availability.insert(day, availability);
        self
    }

    /// Marks the coach available all day on every given day.
    pub fn available_on(mut self, days: &[Day]) -> Self {
        for &day in days {
            self.availability.insert(day, DayAvailability::FULL);
        }
        self
    }

    /// Whether the coach may teach the level.
    pub fn is_qualified(&self, level: &str) -> bool {
        self.qualifications.contains(level)
    }

    /// Whether the coach may work at the branch.
    pub fn works_at(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }

    /// Whether the coach may teach `level` at `branch`.
    pub fn can_teach(&self, branch: &str, level: &str) -> bool {
        self.works_at(branch) && self.is_qualified(level)
    }

    /// Whether the coach is available on `day` during `period`.
    pub fn is_available(&self, day: Day, period: Period) -> bool {
        self.availability
            .get(&day)
            .is_some_and(|a| a.allows(period))
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
