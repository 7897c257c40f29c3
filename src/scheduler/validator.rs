//! Constraint validator.
//!
//! The single gate every tentative class passes before it is committed.
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Coach availability for (day, period)
//! 2. No overlap with the coach's classes that day
//! 3. One branch per coach per day
//! 4. Weekly class cap by employment status
//! 5. Daily class cap by day type
//! 6. Daily minute cap by day type
//! 7. Consecutive classes without a break
//! 8. Branch room capacity in every 30-minute cell of the class
//!
//! A rejection is a normal search outcome, not an error.

use std::collections::HashMap;
use std::fmt;

use super::state::SchedulingState;
use crate::config::WorkloadLimits;
use crate::models::{Candidate, Catalog, Coach, Interval};

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    UnknownCoach,
    Unavailable,
    Overlap,
    OtherBranch,
    WeeklyCap,
    DailyClasses,
    DailyMinutes,
    Consecutive,
    BranchCapacity,
}

impl Rejection {
    pub fn reason(self) -> &'static str {
        match self {
            Rejection::UnknownCoach => "unknown coach",
            Rejection::Unavailable => "coach unavailable",
            Rejection::Overlap => "overlaps another class",
            Rejection::OtherBranch => "coach works at another branch that day",
            Rejection::WeeklyCap => "weekly class cap reached",
            Rejection::DailyClasses => "daily class cap reached",
            Rejection::DailyMinutes => "daily minute cap exceeded",
            Rejection::Consecutive => "too many consecutive classes",
            Rejection::BranchCapacity => "branch rooms full",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Whether a day's classes contain more than `consecutive_limit` classes
/// in a row with every gap below `min_break_minutes`.
///
/// Intervals may be given in any order.
pub fn exceeds_consecutive_limit(intervals: &[Interval], limits: &WorkloadLimits) -> bool {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|i| i.start);

    let mut run = 1u32;
    for pair in sorted.windows(2) {
        if pair[0].gap_minutes(&pair[1]) < i64::from(limits.min_break_minutes) {
            run += 1;
            if run > limits.consecutive_limit {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// Read-only validator over a scheduling state.
#[derive(Debug, Clone)]
pub struct ConstraintValidator<'a> {
    coaches: HashMap<&'a str, &'a Coach>,
    catalog: &'a Catalog,
    limits: &'a WorkloadLimits,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(coaches: &'a [Coach], catalog: &'a Catalog, limits: &'a WorkloadLimits) -> Self {
        Self {
            coaches: coaches.iter().map(|c| (c.id.as_str(), c)).collect(),
            catalog,
            limits,
        }
    }

    /// Looks up a coach.
    pub fn coach(&self, id: &str) -> Option<&'a Coach> {
        self.coaches.get(id).copied()
    }

    /// Whether the candidate may be committed.
    pub fn validate(&self, candidate: &Candidate, state: &SchedulingState) -> bool {
        self.check(candidate, state).is_ok()
    }

    /// Runs every check in order; returns the first failure.
    pub fn check(&self, candidate: &Candidate, state: &SchedulingState) -> Result<(), Rejection> {
        let coach = self.coach(&candidate.coach_id).ok_or(Rejection::UnknownCoach)?;

        if !coach.is_available(candidate.day, candidate.period) {
            return Err(Rejection::Unavailable);
        }

        let interval = candidate.interval();
        let load = state.coach_day(&candidate.coach_id, candidate.day);

        if let Some(load) = load {
            if load.intervals.iter().any(|i| i.overlaps(&interval)) {
                return Err(Rejection::Overlap);
            }
            if load
                .branch
                .as_deref()
                .is_some_and(|b| b != candidate.branch)
            {
                return Err(Rejection::OtherBranch);
            }
        }

        if state.weekly_classes(&candidate.coach_id) >= self.limits.weekly_cap(coach.status) {
            return Err(Rejection::WeeklyCap);
        }

        let day_type = self.catalog.day_type(candidate.day);
        let (classes, minutes) = load.map_or((0, 0), |l| (l.classes, l.minutes));

        if classes >= self.limits.daily_classes(day_type) {
            return Err(Rejection::DailyClasses);
        }
        if minutes + candidate.duration_minutes > self.limits.daily_minutes(day_type) {
            return Err(Rejection::DailyMinutes);
        }

        if let Some(load) = load {
            let mut day = load.intervals.clone();
            day.push(interval);
            if exceeds_consecutive_limit(&day, self.limits) {
                return Err(Rejection::Consecutive);
            }
        }

        let limit = self.catalog.branch_limit(&candidate.branch);
        if interval
            .half_hour_cells()
            .any(|cell| state.branch_usage(&candidate.branch, candidate.day, cell) >= limit)
        {
            return Err(Rejection::BranchCapacity);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClockTime, Day, DayAvailability, Requirement};

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn cand(id: u32, coach: &str, branch: &str, day: Day, start: &str, end: &str) -> Candidate {
        Candidate::new(id, coach, branch, "L1", day, t(start), t(end)).with_capacity(8)
    }

    fn coaches() -> Vec<Coach> {
        let days = [Day::Tue, Day::Wed, Day::Sat];
        vec![
            Coach::full_time("C1")
                .with_qualification("L1")
                .with_branch("BB")
                .with_branch("KT")
                .available_on(&days),
            Coach::branch_manager("M1")
                .with_qualification("L1")
                .with_branch("BB")
                .available_on(&days),
            Coach::part_time("P1")
                .with_qualification("L1")
                .with_branch("BB")
                .with_availability(
                    Day::Wed,
                    DayAvailability {
                        morning: true,
                        afternoon: false,
                    },
                ),
        ]
    }

    fn state() -> SchedulingState {
        SchedulingState::new(&[Requirement::new("BB", "L1", 200), Requirement::new("KT", "L1", 200)])
    }

    fn commit(state: &mut SchedulingState, c: &Candidate) {
        state.record(c, &[(c.level.clone(), 1)]);
    }

    #[test]
    fn test_accepts_free_slot() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let s = state();
        assert!(v.validate(&cand(1, "C1", "BB", Day::Tue, "15:00", "16:30"), &s));
    }

    #[test]
    fn test_unknown_coach_and_availability() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let s = state();
        assert_eq!(
            v.check(&cand(1, "ghost", "BB", Day::Tue, "15:00", "16:30"), &s),
            Err(Rejection::UnknownCoach)
        );
        assert_eq!(
            v.check(&cand(1, "C1", "BB", Day::Fri, "15:00", "16:30"), &s),
            Err(Rejection::Unavailable)
        );
        assert!(v.validate(&cand(1, "P1", "BB", Day::Wed, "10:00", "11:30"), &s));
        assert_eq!(
            v.check(&cand(1, "P1", "BB", Day::Wed, "14:00", "15:30"), &s),
            Err(Rejection::Unavailable)
        );
    }

    #[test]
    fn test_overlap_and_branch() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let mut s = state();
        commit(&mut s, &cand(1, "C1", "BB", Day::Tue, "15:00", "16:30"));

        assert_eq!(
            v.check(&cand(2, "C1", "BB", Day::Tue, "16:00", "17:30"), &s),
            Err(Rejection::Overlap)
        );
        assert_eq!(
            v.check(&cand(3, "C1", "KT", Day::Tue, "17:30", "19:00"), &s),
            Err(Rejection::OtherBranch)
        );
        // Touching intervals do not overlap
        assert!(v.validate(&cand(4, "C1", "BB", Day::Tue, "16:30", "18:00"), &s));
        // Another day is free to use another branch
        assert!(v.validate(&cand(5, "C1", "KT", Day::Wed, "15:00", "16:30"), &s));
    }

    #[test]
    fn test_weekly_cap() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let mut s = state();
        commit(&mut s, &cand(1, "M1", "BB", Day::Tue, "15:00", "16:00"));
        commit(&mut s, &cand(2, "M1", "BB", Day::Wed, "15:00", "16:00"));
        commit(&mut s, &cand(3, "M1", "BB", Day::Sat, "09:00", "10:00"));
        assert_eq!(
            v.check(&cand(4, "M1", "BB", Day::Sat, "12:00", "13:00"), &s),
            Err(Rejection::WeeklyCap)
        );
    }

    #[test]
    fn test_daily_class_and_minute_caps() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits {
            weekday_daily_minutes: 150,
            ..WorkloadLimits::default()
        };
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let mut s = state();
        commit(&mut s, &cand(1, "C1", "BB", Day::Tue, "10:00", "11:30"));
        assert_eq!(
            v.check(&cand(2, "C1", "BB", Day::Tue, "13:00", "14:30"), &s),
            Err(Rejection::DailyMinutes)
        );
        assert!(v.validate(&cand(3, "C1", "BB", Day::Tue, "13:00", "14:00"), &s));
        commit(&mut s, &cand(3, "C1", "BB", Day::Tue, "13:00", "14:00"));
        commit(&mut s, &cand(4, "C1", "BB", Day::Tue, "15:00", "15:30"));
        assert_eq!(
            v.check(&cand(5, "C1", "BB", Day::Tue, "17:00", "17:30"), &s),
            Err(Rejection::DailyClasses)
        );
    }

    #[test]
    fn test_consecutive_limit() {
        let coaches = coaches();
        let catalog = Catalog::default();
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let mut s = state();
        commit(&mut s, &cand(1, "C1", "BB", Day::Sat, "09:00", "10:00"));
        commit(&mut s, &cand(2, "C1", "BB", Day::Sat, "10:00", "11:00"));
        commit(&mut s, &cand(3, "C1", "BB", Day::Sat, "11:30", "12:30"));
        assert_eq!(
            v.check(&cand(4, "C1", "BB", Day::Sat, "13:00", "14:00"), &s),
            Err(Rejection::Consecutive)
        );
        // A full hour break resets the run
        assert!(v.validate(&cand(5, "C1", "BB", Day::Sat, "13:30", "14:30"), &s));
    }

    #[test]
    fn test_branch_capacity() {
        let coaches = coaches();
        let catalog = Catalog::default().with_branch_limit("BB", 1);
        let limits = WorkloadLimits::default();
        let v = ConstraintValidator::new(&coaches, &catalog, &limits);
        let mut s = state();
        commit(&mut s, &cand(1, "C1", "BB", Day::Sat, "09:00", "10:30"));
        assert_eq!(
            v.check(&cand(2, "M1", "BB", Day::Sat, "10:00", "11:00"), &s),
            Err(Rejection::BranchCapacity)
        );
        assert!(v.validate(&cand(3, "M1", "BB", Day::Sat, "10:30", "11:30"), &s));
    }

    #[test]
    fn test_exceeds_consecutive_limit_unsorted() {
        let limits = WorkloadLimits {
            consecutive_limit: 2,
            ..WorkloadLimits::default()
        };
        let iv = |a: &str, b: &str| Interval::new(t(a), t(b));
        let day = vec![iv("11:00", "12:00"), iv("09:00", "10:00"), iv("10:00", "11:00")];
        assert!(exceeds_consecutive_limit(&day, &limits));
        let spaced = vec![iv("09:00", "10:00"), iv("10:00", "11:00"), iv("12:00", "13:00")];
        assert!(!exceeds_consecutive_limit(&spaced, &limits));
    }
}
