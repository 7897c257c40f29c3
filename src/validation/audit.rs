//! Comprehensive schedule audit.
//!
//! Re-derives every hard constraint from a finished schedule without
//! trusting the decisions made while building it. Read-only: the audited
//! entries are never modified, and auditing the same entries twice yields
//! the same report.
//!
//! # Hard checks
//! - Seats per (branch, level) against enrollment
//! - Class capacity
//! - Daily class and minute limits per coach
//! - Weekly class cap per coach
//! - Consecutive classes without the minimum break
//! - Branch room capacity per 30-minute cell
//! - Coach qualification for the class level
//! - One branch per coach per day
//! - No overlapping classes per coach
//!
//! # Advisory checks
//! - Same-level classes back to back on a weekday morning while the earlier
//!   one still has seats
//! - Several same-level classes starting together at one branch
//! - Students of a merged level seated with a coach not qualified for it

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::config::WorkloadLimits;
use crate::models::{
    Catalog, ClockTime, Coach, Day, DayType, Period, Requirement, RequirementKey, Schedule,
    ScheduledEntry, SchedulingProblem, Violation, ViolationType,
};
use crate::scheduler::{coverage, exceeds_consecutive_limit};

/// Overall audit verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Passed,
    PassedWithWarnings,
    Failed,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditStatus::Passed => "PASSED",
            AuditStatus::PassedWithWarnings => "PASSED_WITH_WARNINGS",
            AuditStatus::Failed => "FAILED",
        })
    }
}

/// Seats scheduled for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub branch: String,
    pub level: String,
    pub required: u32,
    pub scheduled: u32,
    pub coverage_percentage: f64,
}

/// Result of an audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub status: AuditStatus,
    /// Hard violations.
    pub violations: Vec<Violation>,
    /// Advisory findings.
    pub warnings: Vec<Violation>,
    /// In requirement input order.
    pub requirement_coverage: Vec<RequirementCoverage>,
}

impl AuditReport {
    /// Whether no hard violation was found.
    pub fn passed(&self) -> bool {
        self.status != AuditStatus::Failed
    }

    /// Whether the only hard violations are unmet demand.
    ///
    /// A schedule that leaves students unplaced but breaks no rule is a
    /// usable partial result.
    pub fn is_feasible(&self) -> bool {
        self.violations
            .iter()
            .all(|v| v.violation_type == ViolationType::UnderScheduled)
    }

    /// Findings of one type, hard or advisory.
    pub fn count(&self, violation_type: ViolationType) -> usize {
        self.violations
            .iter()
            .chain(&self.warnings)
            .filter(|v| v.violation_type == violation_type)
            .count()
    }
}

/// Audits finished schedules against a problem.
#[derive(Debug, Clone)]
pub struct ComprehensiveValidator<'a> {
    coaches: HashMap<&'a str, &'a Coach>,
    requirements: &'a [Requirement],
    catalog: &'a Catalog,
    limits: &'a WorkloadLimits,
}

impl<'a> ComprehensiveValidator<'a> {
    pub fn new(problem: &'a SchedulingProblem, limits: &'a WorkloadLimits) -> Self {
        Self {
            coaches: problem.coach_index(),
            requirements: &problem.requirements,
            catalog: &problem.catalog,
            limits,
        }
    }

    /// Audits a schedule.
    pub fn audit(&self, entries: &[ScheduledEntry]) -> AuditReport {
        let mut findings = Vec::new();

        let requirement_coverage = self.check_coverage(entries, &mut findings);
        self.check_capacity(entries, &mut findings);
        self.check_qualifications(entries, &mut findings);
        self.check_coach_days(entries, &mut findings);
        self.check_weekly(entries, &mut findings);
        self.check_branch_cells(entries, &mut findings);
        self.check_back_to_back(entries, &mut findings);
        self.check_diversity(entries, &mut findings);
        self.check_merged_levels(entries, &mut findings);

        let (warnings, violations): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|v| v.violation_type.is_advisory());

        let status = if !violations.is_empty() {
            AuditStatus::Failed
        } else if !warnings.is_empty() {
            AuditStatus::PassedWithWarnings
        } else {
            AuditStatus::Passed
        };

        AuditReport {
            status,
            violations,
            warnings,
            requirement_coverage,
        }
    }

    fn check_coverage(
        &self,
        entries: &[ScheduledEntry],
        violations: &mut Vec<Violation>,
    ) -> Vec<RequirementCoverage> {
        let mut seated: HashMap<RequirementKey, u32> = HashMap::new();
        for entry in entries {
            for (key, n) in entry.seated_by_requirement() {
                *seated.entry(key).or_insert(0) += n;
            }
        }

        self.requirements
            .iter()
            .map(|req| {
                let key = req.key();
                let scheduled = seated.get(&key).copied().unwrap_or(0);
                let pct = coverage(scheduled, req.students);
                if scheduled < req.students {
                    violations.push(Violation::new(
                        ViolationType::UnderScheduled,
                        key.to_string(),
                        format!(
                            "{key}: {scheduled} of {} students scheduled ({pct:.1}%)",
                            req.students
                        ),
                    ));
                }
                RequirementCoverage {
                    branch: req.branch.clone(),
                    level: req.level.clone(),
                    required: req.students,
                    scheduled,
                    coverage_percentage: if req.students == 0 { 100.0 } else { pct },
                }
            })
            .collect()
    }

    fn check_capacity(&self, entries: &[ScheduledEntry], violations: &mut Vec<Violation>) {
        for entry in entries {
            if entry.actual_students > entry.capacity() {
                violations.push(Violation::new(
                    ViolationType::CapacityExceeded,
                    describe(entry),
                    format!(
                        "{} students in a class of {}",
                        entry.actual_students,
                        entry.capacity()
                    ),
                ));
            }
        }
    }

    fn check_qualifications(&self, entries: &[ScheduledEntry], violations: &mut Vec<Violation>) {
        for entry in entries {
            match self.coaches.get(entry.coach_id()) {
                Some(coach) if coach.is_qualified(entry.level()) => {}
                Some(_) => violations.push(Violation::new(
                    ViolationType::Unqualified,
                    entry.coach_id(),
                    format!("not qualified for {} ({})", entry.level(), describe(entry)),
                )),
                None => violations.push(Violation::new(
                    ViolationType::Unqualified,
                    entry.coach_id(),
                    format!("unknown coach ({})", describe(entry)),
                )),
            }
        }
    }

    fn check_coach_days(&self, entries: &[ScheduledEntry], violations: &mut Vec<Violation>) {
        let schedule = Schedule::from_entries(entries.to_vec());
        for ((coach, day), group) in schedule.by_coach_day() {
            let subject = format!("{coach} {day}");
            let day_type = self.catalog.day_type(day);

            let classes = group.len() as u32;
            let class_limit = self.limits.daily_classes(day_type);
            if classes > class_limit {
                violations.push(Violation::new(
                    ViolationType::DailyClassLimit,
                    &subject,
                    format!("{classes} classes, limit {class_limit}"),
                ));
            }

            let minutes: u32 = group.iter().map(|e| e.candidate.duration_minutes).sum();
            let minute_limit = self.limits.daily_minutes(day_type);
            if minutes > minute_limit {
                violations.push(Violation::new(
                    ViolationType::DailyMinuteLimit,
                    &subject,
                    format!("{minutes} minutes, limit {minute_limit}"),
                ));
            }

            let intervals: Vec<_> = group.iter().map(|e| e.interval()).collect();
            if exceeds_consecutive_limit(&intervals, self.limits) {
                violations.push(Violation::new(
                    ViolationType::ConsecutiveClasses,
                    &subject,
                    format!(
                        "more than {} classes without a {}-minute break",
                        self.limits.consecutive_limit, self.limits.min_break_minutes
                    ),
                ));
            }

            let branches: BTreeSet<&str> = group.iter().map(|e| e.branch()).collect();
            if branches.len() > 1 {
                let list: Vec<&str> = branches.into_iter().collect();
                violations.push(Violation::new(
                    ViolationType::MultipleBranches,
                    &subject,
                    format!("works at {}", list.join(", ")),
                ));
            }

            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if a.interval().overlaps(&b.interval()) {
                        violations.push(Violation::new(
                            ViolationType::Overlap,
                            &subject,
                            format!("{} overlaps {}", a.interval(), b.interval()),
                        ));
                    }
                }
            }
        }
    }

    fn check_weekly(&self, entries: &[ScheduledEntry], violations: &mut Vec<Violation>) {
        let mut weekly: BTreeMap<&str, u32> = BTreeMap::new();
        for entry in entries {
            *weekly.entry(entry.coach_id()).or_insert(0) += 1;
        }
        for (coach_id, classes) in weekly {
            let Some(coach) = self.coaches.get(coach_id) else {
                continue;
            };
            let cap = self.limits.weekly_cap(coach.status);
            if classes > cap {
                violations.push(Violation::new(
                    ViolationType::WeeklyClassLimit,
                    coach_id,
                    format!("{classes} classes, weekly cap {cap}"),
                ));
            }
        }
    }

    fn check_branch_cells(&self, entries: &[ScheduledEntry], violations: &mut Vec<Violation>) {
        let mut usage: BTreeMap<(&str, Day, u32), u32> = BTreeMap::new();
        for entry in entries {
            for cell in entry.interval().half_hour_cells() {
                *usage.entry((entry.branch(), entry.day(), cell)).or_insert(0) += 1;
            }
        }
        for ((branch, day, cell), count) in usage {
            let limit = self.catalog.branch_limit(branch);
            if count > limit {
                let at = ClockTime::from_minutes(cell * 30)
                    .map(|t| t.to_string())
                    .unwrap_or_default();
                violations.push(Violation::new(
                    ViolationType::BranchCapacity,
                    format!("{branch} {day} {at}"),
                    format!("{count} concurrent classes, limit {limit}"),
                ));
            }
        }
    }

    fn check_back_to_back(&self, entries: &[ScheduledEntry], warnings: &mut Vec<Violation>) {
        let mut groups: BTreeMap<(&str, Day, &str), Vec<&ScheduledEntry>> = BTreeMap::new();
        for entry in entries {
            if self.catalog.day_type(entry.day()) == DayType::Weekday {
                groups
                    .entry((entry.branch(), entry.day(), entry.level()))
                    .or_default()
                    .push(entry);
            }
        }

        let min_break = i64::from(self.limits.min_break_minutes);
        for ((branch, day, level), mut group) in groups {
            group.sort_by_key(|e| (e.candidate.start, e.candidate.id));
            for pair in group.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                if earlier.candidate.period != Period::Morning || earlier.is_full() {
                    continue;
                }
                let gap = earlier.interval().gap_minutes(&later.interval());
                if (0..min_break).contains(&gap) {
                    warnings.push(Violation::new(
                        ViolationType::BackToBackSameLevel,
                        format!("{branch} {day} {level}"),
                        format!(
                            "{} ({}/{}) followed by {} after {gap} minutes",
                            earlier.interval(),
                            earlier.actual_students,
                            earlier.capacity(),
                            later.interval()
                        ),
                    ));
                }
            }
        }
    }

    fn check_merged_levels(&self, entries: &[ScheduledEntry], warnings: &mut Vec<Violation>) {
        for entry in entries {
            let Some(coach) = self.coaches.get(entry.coach_id()) else {
                continue;
            };
            for level in entry.allocations.keys() {
                if level != entry.level() && !coach.is_qualified(level) {
                    warnings.push(Violation::new(
                        ViolationType::MergedUnqualified,
                        entry.coach_id(),
                        format!(
                            "{} seats {level} students without that qualification ({})",
                            coach.display_name(),
                            describe(entry)
                        ),
                    ));
                }
            }
        }
    }

    fn check_diversity(&self, entries: &[ScheduledEntry], warnings: &mut Vec<Violation>) {
        let mut slots: BTreeMap<(&str, Day, ClockTime, &str), u32> = BTreeMap::new();
        for entry in entries {
            *slots
                .entry((entry.branch(), entry.day(), entry.candidate.start, entry.level()))
                .or_insert(0) += 1;
        }
        for ((branch, day, start, level), count) in slots {
            if count > 1 {
                warnings.push(Violation::new(
                    ViolationType::LowDiversity,
                    format!("{branch} {day} {start}"),
                    format!("{count} {level} classes start together"),
                ));
            }
        }
    }
}

fn describe(entry: &ScheduledEntry) -> String {
    format!(
        "{} {} {} {} {}",
        entry.coach_id(),
        entry.branch(),
        entry.level(),
        entry.day(),
        entry.interval()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn entry(
        id: u32,
        coach: &str,
        level: &str,
        day: Day,
        start: &str,
        end: &str,
        students: u32,
    ) -> ScheduledEntry {
        let cand = Candidate::new(id, coach, "BB", level, day, t(start), t(end)).with_capacity(8);
        ScheduledEntry::new(cand, students)
    }

    fn problem(required: u32) -> SchedulingProblem {
        SchedulingProblem::new(Catalog::default())
            .with_coach(
                Coach::full_time("C1")
                    .with_qualification("L1")
                    .with_branch("BB")
                    .available_on(&Day::ALL),
            )
            .with_coach(
                Coach::part_time("C2")
                    .with_qualification("L1")
                    .with_branch("BB")
                    .available_on(&Day::ALL),
            )
            .with_requirement(Requirement::new("BB", "L1", required))
    }

    #[test]
    fn test_clean_schedule_passes() {
        let p = problem(16);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);
        let entries = vec![
            entry(1, "C1", "L1", Day::Sat, "09:00", "10:30", 8),
            entry(2, "C1", "L1", Day::Sat, "11:30", "13:00", 8),
        ];
        let report = validator.audit(&entries);
        assert_eq!(report.status, AuditStatus::Passed);
        assert!(report.passed());
        assert_eq!(report.requirement_coverage.len(), 1);
        assert!((report.requirement_coverage[0].coverage_percentage - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_under_scheduled_fails() {
        let p = problem(20);
        let limits = WorkloadLimits::default();
        let report = ComprehensiveValidator::new(&p, &limits)
            .audit(&[entry(1, "C1", "L1", Day::Sat, "09:00", "10:30", 8)]);
        assert_eq!(report.status, AuditStatus::Failed);
        assert_eq!(report.count(ViolationType::UnderScheduled), 1);
        assert!(report.is_feasible());
        assert!((report.requirement_coverage[0].coverage_percentage - 40.0).abs() < 1e-10);
    }

    #[test]
    fn test_hard_violations_detected() {
        let p = problem(0);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);

        let mut overfull = entry(1, "C1", "L1", Day::Wed, "15:00", "16:30", 8);
        overfull.actual_students = 9;
        let mut elsewhere = entry(3, "C1", "L1", Day::Wed, "18:00", "19:00", 4);
        elsewhere.candidate.branch = "KT".into();
        let entries = vec![
            overfull,
            entry(2, "C1", "L1", Day::Wed, "16:00", "17:00", 4),
            elsewhere,
            entry(4, "C1", "L9", Day::Wed, "17:00", "17:30", 4),
            entry(5, "X9", "L1", Day::Sat, "09:00", "10:00", 4),
        ];
        let report = validator.audit(&entries);

        assert_eq!(report.status, AuditStatus::Failed);
        assert!(!report.is_feasible());
        assert_eq!(report.count(ViolationType::CapacityExceeded), 1);
        assert_eq!(report.count(ViolationType::Overlap), 1);
        assert_eq!(report.count(ViolationType::MultipleBranches), 1);
        assert_eq!(report.count(ViolationType::DailyClassLimit), 1);
        assert_eq!(report.count(ViolationType::Unqualified), 2);
        // 90 + 60 + 60 + 30 minutes
        assert_eq!(report.count(ViolationType::DailyMinuteLimit), 0);
    }

    #[test]
    fn test_weekly_cap_and_branch_capacity() {
        let p = problem(0).with_coach(
            Coach::branch_manager("M1")
                .with_qualification("L1")
                .with_branch("BB"),
        );
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);
        let entries: Vec<ScheduledEntry> = [Day::Tue, Day::Wed, Day::Thu, Day::Fri]
            .iter()
            .enumerate()
            .map(|(i, &d)| entry(i as u32, "M1", "L1", d, "15:00", "16:30", 4))
            .collect();
        let report = validator.audit(&entries);
        assert_eq!(report.count(ViolationType::WeeklyClassLimit), 1);

        let crowded: Vec<ScheduledEntry> = (0..5)
            .map(|i| entry(i, &format!("K{i}"), "L1", Day::Sat, "09:00", "10:00", 4))
            .collect();
        let report = validator.audit(&crowded);
        // Two cells (09:00, 09:30), each with 5 classes against a limit of 4
        assert_eq!(report.count(ViolationType::BranchCapacity), 2);
    }

    #[test]
    fn test_back_to_back_warning_on_weekday_morning() {
        let p = problem(12);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);
        let entries = vec![
            entry(1, "C1", "L1", Day::Wed, "09:00", "10:00", 5),
            entry(2, "C2", "L1", Day::Wed, "10:30", "11:30", 7),
        ];
        let report = validator.audit(&entries);
        assert_eq!(report.status, AuditStatus::PassedWithWarnings);
        assert!(report.violations.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].violation_type,
            ViolationType::BackToBackSameLevel
        );
    }

    #[test]
    fn test_no_back_to_back_warning_when_full_or_weekend() {
        let p = problem(16);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);

        let full = vec![
            entry(1, "C1", "L1", Day::Wed, "09:00", "10:00", 8),
            entry(2, "C2", "L1", Day::Wed, "10:30", "11:30", 8),
        ];
        assert_eq!(validator.audit(&full).status, AuditStatus::Passed);

        let weekend = vec![
            entry(1, "C1", "L1", Day::Sat, "09:00", "10:00", 6),
            entry(2, "C2", "L1", Day::Sat, "10:30", "11:30", 8),
        ];
        assert_eq!(validator.audit(&weekend).count(ViolationType::BackToBackSameLevel), 0);
    }

    #[test]
    fn test_low_diversity_warning() {
        let p = problem(16);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);
        let entries = vec![
            entry(1, "C1", "L1", Day::Sat, "14:00", "15:30", 8),
            entry(2, "C2", "L1", Day::Sat, "14:00", "15:30", 8),
        ];
        let report = validator.audit(&entries);
        assert_eq!(report.status, AuditStatus::PassedWithWarnings);
        assert_eq!(report.count(ViolationType::LowDiversity), 1);
    }

    #[test]
    fn test_merged_level_outside_qualifications_warns() {
        let p = problem(5).with_coach(
            Coach::full_time("C3")
                .with_name("Robin")
                .with_qualification("L1")
                .with_qualification("L2")
                .with_branch("BB")
                .available_on(&Day::ALL),
        );
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);

        let mut merged = entry(1, "C1", "L1", Day::Wed, "15:00", "16:30", 5);
        merged.add_students("L2", 2);
        let report = validator.audit(&[merged]);
        assert_eq!(report.status, AuditStatus::PassedWithWarnings);
        assert_eq!(report.count(ViolationType::MergedUnqualified), 1);
        assert!(report.warnings[0].message.contains("L2"));

        let mut qualified = entry(2, "C3", "L1", Day::Wed, "15:00", "16:30", 5);
        qualified.add_students("L2", 2);
        let report = validator.audit(&[qualified]);
        assert_eq!(report.status, AuditStatus::Passed);
        assert_eq!(report.count(ViolationType::MergedUnqualified), 0);
    }

    #[test]
    fn test_audit_is_idempotent() {
        let p = problem(30);
        let limits = WorkloadLimits::default();
        let validator = ComprehensiveValidator::new(&p, &limits);
        let entries = vec![
            entry(1, "C1", "L1", Day::Wed, "09:00", "10:00", 5),
            entry(2, "C2", "L1", Day::Wed, "10:30", "11:30", 7),
            entry(3, "C1", "L1", Day::Wed, "09:30", "10:30", 9),
        ];
        let before = entries.clone();
        let first = validator.audit(&entries);
        let second = validator.audit(&entries);
        assert_eq!(first, second);
        assert_eq!(entries, before);
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&AuditStatus::PassedWithWarnings).unwrap();
        assert_eq!(json, "\"PASSED_WITH_WARNINGS\"");
    }
}
