//! Schedule statistics.
//!
//! Computes aggregate indicators from a finished schedule and its input
//! problem.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage | Students scheduled / students required, in percent |
//! | Coaches used | Coaches of a status with at least one class |
//! | Avg classes per coach | Classes of a status / coaches of that status |
//! | Utilization rate | Coaches used / coaches of that status, in percent |
//! | Popular slots used | Classes placed on a popular slot |
//! | Merged classes | Classes seating more than one level |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Day, EmploymentStatus, SchedulingProblem, ScheduledEntry};

/// Per employment status coach usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachUtilization {
    pub total_coaches: usize,
    pub coaches_used: usize,
    pub total_classes: u32,
    pub avg_classes_per_coach: f64,
    /// Percent of coaches with at least one class.
    pub utilization_rate: f64,
}

/// Aggregate schedule statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatistics {
    pub total_classes: usize,
    pub total_students_scheduled: u32,
    pub total_students_required: u32,
    pub coverage_percentage: f64,
    pub perfect_coverage: bool,
    pub coach_utilization: BTreeMap<EmploymentStatus, CoachUtilization>,
    pub popular_slots_used: usize,
    pub merged_classes: usize,
}

impl ScheduleStatistics {
    /// Computes statistics from entries and the problem they solve.
    pub fn calculate(entries: &[ScheduledEntry], problem: &SchedulingProblem) -> Self {
        let total_students_scheduled: u32 = entries.iter().map(|e| e.actual_students).sum();
        let total_students_required = problem.total_required();
        let coverage_percentage = coverage(total_students_scheduled, total_students_required);

        let mut workload: BTreeMap<&str, u32> = BTreeMap::new();
        for entry in entries {
            *workload.entry(entry.coach_id()).or_insert(0) += 1;
        }

        let coach_utilization = EmploymentStatus::ALL
            .iter()
            .map(|&status| {
                let coaches: Vec<&str> = problem
                    .coaches
                    .iter()
                    .filter(|c| c.status == status)
                    .map(|c| c.id.as_str())
                    .collect();
                let total_coaches = coaches.len();
                let total_classes: u32 = coaches
                    .iter()
                    .map(|id| workload.get(id).copied().unwrap_or(0))
                    .sum();
                let coaches_used = coaches
                    .iter()
                    .filter(|id| workload.get(*id).is_some_and(|&n| n > 0))
                    .count();
                let (avg_classes_per_coach, utilization_rate) = if total_coaches == 0 {
                    (0.0, 0.0)
                } else {
                    (
                        f64::from(total_classes) / total_coaches as f64,
                        coaches_used as f64 / total_coaches as f64 * 100.0,
                    )
                };
                (
                    status,
                    CoachUtilization {
                        total_coaches,
                        coaches_used,
                        total_classes,
                        avg_classes_per_coach,
                        utilization_rate,
                    },
                )
            })
            .collect();

        Self {
            total_classes: entries.len(),
            total_students_scheduled,
            total_students_required,
            coverage_percentage,
            perfect_coverage: coverage_percentage >= 100.0,
            coach_utilization,
            popular_slots_used: entries.iter().filter(|e| e.candidate.is_popular).count(),
            merged_classes: entries.iter().filter(|e| e.is_merged()).count(),
        }
    }
}

/// Scheduled / required as a percentage; 0 when nothing is required.
pub fn coverage(scheduled: u32, required: u32) -> f64 {
    if required == 0 {
        0.0
    } else {
        f64::from(scheduled) / f64::from(required) * 100.0
    }
}

/// Class and student counts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub classes: u32,
    pub students: u32,
}

impl GroupCount {
    fn add(&mut self, students: u32) {
        self.classes += 1;
        self.students += students;
    }
}

/// Detailed per-group counts.
///
/// Students in merged classes count under the level they were allocated
/// to; the class itself counts once, under its own level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBreakdown {
    pub by_level: BTreeMap<String, GroupCount>,
    pub by_branch: BTreeMap<String, GroupCount>,
    pub by_coach: BTreeMap<String, GroupCount>,
    pub by_day: BTreeMap<Day, GroupCount>,
    /// Keyed by start hour.
    pub by_hour: BTreeMap<u32, GroupCount>,
}

impl ScheduleBreakdown {
    pub fn calculate(entries: &[ScheduledEntry]) -> Self {
        let mut breakdown = Self::default();
        for entry in entries {
            let students = entry.actual_students;
            let level = breakdown.by_level.entry(entry.level().to_string()).or_default();
            level.classes += 1;
            for (name, seated) in &entry.allocations {
                breakdown.by_level.entry(name.clone()).or_default().students += seated;
            }
            breakdown
                .by_branch
                .entry(entry.branch().to_string())
                .or_default()
                .add(students);
            breakdown
                .by_coach
                .entry(entry.coach_id().to_string())
                .or_default()
                .add(students);
            breakdown.by_day.entry(entry.day()).or_default().add(students);
            breakdown
                .by_hour
                .entry(entry.candidate.start.hour())
                .or_default()
                .add(students);
        }
        breakdown
    }
}
