//! Timetabling domain models.
//!
//! Provides the data types for describing a class-scheduling problem and
//! its solution.
//!
//! # Domain Mappings
//!
//! | u-timetable | Meaning |
//! |-------------|---------|
//! | Coach | Instructor with qualifications, branches and availability |
//! | Requirement | Enrolled students for one (branch, level) |
//! | Candidate | A feasible (coach, branch, level, day, timeslot) |
//! | ScheduledEntry | A committed class with seated students |
//! | Catalog | Capacities, durations, room limits, level hierarchy |

mod candidate;
mod catalog;
mod coach;
mod problem;
mod requirement;
mod schedule;
mod time;

pub use candidate::Candidate;
pub use catalog::{
    Catalog, DEFAULT_BRANCH_LIMIT, DEFAULT_LEVEL_CAPACITY, UNKNOWN_LEVEL_COMPLEXITY,
};
pub use coach::{Coach, DayAvailability, EmploymentStatus};
pub use problem::SchedulingProblem;
pub use requirement::{Requirement, RequirementKey};
pub use schedule::{Schedule, ScheduledEntry, Violation, ViolationType};
pub use time::{ClockTime, Day, DayType, Interval, Period, TimeParseError};
