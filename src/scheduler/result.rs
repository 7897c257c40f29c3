//! Scheduling results.

use serde::{Deserialize, Serialize};

use super::kpi::{ScheduleBreakdown, ScheduleStatistics};
use crate::models::{Schedule, ScheduledEntry, SchedulingProblem};
use crate::validation::AuditReport;

/// Why a requirement could not be fully scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapReason {
    /// No coach is qualified for the level at the branch.
    NoQualifiedCoach,
    /// The candidate pool has no slot for the (branch, level).
    NoCandidates,
    /// Slots exist but workload or room limits left students unplaced.
    ConstraintLimited,
}

/// Unmet demand for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalGap {
    pub branch: String,
    pub level: String,
    pub required: u32,
    pub scheduled: u32,
    pub gap: u32,
    pub reason: GapReason,
}

/// A finished schedule with its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Classes sorted by day, start time and branch.
    pub schedule: Vec<ScheduledEntry>,
    pub statistics: ScheduleStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScheduleBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditReport>,
    /// In requirement input order.
    pub critical_gaps: Vec<CriticalGap>,
}

impl ScheduleResult {
    /// Builds a result from committed entries.
    pub fn build(entries: Vec<ScheduledEntry>, problem: &SchedulingProblem) -> Self {
        let mut schedule = Schedule::from_entries(entries);
        schedule.sort_chronologically();

        let seated = schedule.seated_by_requirement();
        let critical_gaps = problem
            .requirements
            .iter()
            .filter_map(|req| {
                let scheduled = seated.get(&req.key()).copied().unwrap_or(0);
                if scheduled >= req.students {
                    return None;
                }
                let reason = if problem.qualified_coaches(&req.branch, &req.level).next().is_none() {
                    GapReason::NoQualifiedCoach
                } else if !problem
                    .candidates
                    .iter()
                    .any(|c| c.serves(&req.branch, &req.level))
                {
                    GapReason::NoCandidates
                } else {
                    GapReason::ConstraintLimited
                };
                Some(CriticalGap {
                    branch: req.branch.clone(),
                    level: req.level.clone(),
                    required: req.students,
                    scheduled,
                    gap: req.students - scheduled,
                    reason,
                })
            })
            .collect();

        let statistics = ScheduleStatistics::calculate(&schedule.entries, problem);
        Self {
            schedule: schedule.entries,
            statistics,
            breakdown: None,
            audit: None,
            critical_gaps,
        }
    }

    /// Attaches the per-group breakdown.
    pub fn with_breakdown(mut self) -> Self {
        self.breakdown = Some(ScheduleBreakdown::calculate(&self.schedule));
        self
    }

    pub fn with_audit(mut self, audit: AuditReport) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Coverage in percent.
    pub fn coverage(&self) -> f64 {
        self.statistics.coverage_percentage
    }

    /// Students still unplaced.
    pub fn unassigned_students(&self) -> u32 {
        self.critical_gaps.iter().map(|g| g.gap).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Catalog, ClockTime, Coach, Day, Requirement};

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn entry(id: u32, level: &str, day: Day, start: &str, end: &str, students: u32) -> ScheduledEntry {
        let cand = Candidate::new(id, "C1", "BB", level, day, t(start), t(end)).with_capacity(8);
        ScheduledEntry::new(cand, students)
    }

    #[test]
    fn test_build_sorts_and_reports_gaps() {
        let problem = SchedulingProblem::new(Catalog::default())
            .with_coach(Coach::full_time("C1").with_qualification("L1").with_branch("BB"))
            .with_requirement(Requirement::new("BB", "L1", 20))
            .with_requirement(Requirement::new("BB", "L2", 5))
            .with_requirement(Requirement::new("BB", "L3", 5))
            .with_candidate(Candidate::new(9, "C1", "BB", "L1", Day::Sat, t("09:00"), t("10:30")))
            .with_candidate(Candidate::new(10, "C9", "BB", "L3", Day::Sat, t("09:00"), t("10:30")));

        let result = ScheduleResult::build(
            vec![
                entry(1, "L1", Day::Sun, "09:00", "10:30", 8),
                entry(2, "L1", Day::Sat, "11:00", "12:30", 8),
                entry(3, "L1", Day::Sat, "09:00", "10:30", 2),
            ],
            &problem,
        );

        let ids: Vec<u32> = result.schedule.iter().map(|e| e.candidate.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        assert_eq!(result.critical_gaps.len(), 3);
        assert_eq!(result.critical_gaps[0].gap, 2);
        assert_eq!(result.critical_gaps[0].reason, GapReason::ConstraintLimited);
        assert_eq!(result.critical_gaps[1].reason, GapReason::NoQualifiedCoach);
        assert_eq!(result.critical_gaps[2].reason, GapReason::NoQualifiedCoach);
        assert_eq!(result.unassigned_students(), 12);
        assert!(result.breakdown.is_none());
        assert!(result.clone().with_breakdown().breakdown.is_some());
    }

    #[test]
    fn test_no_candidates_reason() {
        let problem = SchedulingProblem::new(Catalog::default())
            .with_coach(Coach::full_time("C1").with_qualification("L1").with_branch("BB"))
            .with_requirement(Requirement::new("BB", "L1", 4));
        let result = ScheduleResult::build(Vec::new(), &problem);
        assert_eq!(result.critical_gaps[0].reason, GapReason::NoCandidates);
        assert!(result.coverage().abs() < 1e-10);
    }
}
