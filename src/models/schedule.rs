//! Schedule (solution) model.
//!
//! A schedule is the list of committed classes produced by one scheduling
//! run. Each [`ScheduledEntry`] is a committed [`Candidate`] plus the
//! students actually seated in it. Audit findings against a schedule are
//! described by [`Violation`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{Candidate, Day, Interval, RequirementKey};

/// A committed class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    /// The opportunity this class was created from.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Students seated (sum of `allocations`).
    pub actual_students: u32,
    /// Seats per level. A single-level class has one entry; merges add more.
    pub allocations: BTreeMap<String, u32>,
    /// Levels taught together in this class, primary level first.
    pub merged_levels: Vec<String>,
    /// Human-readable merge label, e.g. `"L1+L2"`.
    pub merge_label: Option<String>,
}

impl ScheduledEntry {
    /// Creates an entry seating `students` of the candidate's own level.
    pub fn new(candidate: Candidate, students: u32) -> Self {
        let mut allocations = BTreeMap::new();
        if students > 0 {
            allocations.insert(candidate.level.clone(), students);
        }
        let merged_levels = vec![candidate.level.clone()];
        Self {
            candidate,
            actual_students: students,
            allocations,
            merged_levels,
            merge_label: None,
        }
    }

    /// Maximum students this class can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.candidate.capacity
    }

    /// Remaining seats.
    #[inline]
    pub fn spare_capacity(&self) -> u32 {
        self.capacity().saturating_sub(self.actual_students)
    }

    /// Whether every seat is taken.
    pub fn is_full(&self) -> bool {
        self.actual_students >= self.capacity()
    }

    /// Whether more than one level shares this class.
    pub fn is_merged(&self) -> bool {
        self.merged_levels.len() > 1
    }

    /// The [start, end) interval.
    pub fn interval(&self) -> Interval {
        self.candidate.interval()
    }

    pub fn coach_id(&self) -> &str {
        &self.candidate.coach_id
    }

    pub fn branch(&self) -> &str {
        &self.candidate.branch
    }

    pub fn level(&self) -> &str {
        &self.candidate.level
    }

    pub fn day(&self) -> Day {
        self.candidate.day
    }

    /// Seats `students` more of `level`, never exceeding capacity.
    ///
    /// Returns the number actually seated. Seating a level other than the
    /// class's own records it as merged.
    pub fn add_students(&mut self, level: &str, students: u32) -> u32 {
        let seated = students.min(self.spare_capacity());
        if seated == 0 {
            return 0;
        }
        *self.allocations.entry(level.to_string()).or_insert(0) += seated;
        self.actual_students += seated;
        self.record_level(level);
        seated
    }

    /// Adds a level to the merge metadata.
    pub fn record_level(&mut self, level: &str) {
        if !self.merged_levels.iter().any(|l| l == level) {
            self.merged_levels.push(level.to_string());
        }
        if self.merged_levels.len() > 1 {
            let mut sorted = self.merged_levels.clone();
            sorted.sort();
            self.merge_label = Some(sorted.join("+"));
        }
    }

    /// Students seated for each (branch, level) this class serves.
    pub fn seated_by_requirement(&self) -> impl Iterator<Item = (RequirementKey, u32)> + '_ {
        self.allocations
            .iter()
            .map(|(level, &n)| (RequirementKey::new(self.branch(), level), n))
    }
}

/// An ordered list of committed classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub entries: Vec<ScheduledEntry>,
}

impl Schedule {
    /// Wraps a list of entries.
    pub fn from_entries(entries: Vec<ScheduledEntry>) -> Self {
        Self { entries }
    }

    /// Sorts by day, then start time, then branch.
    pub fn sort_chronologically(&mut self) {
        self.entries.sort_by(|a, b| {
            a.day()
                .cmp(&b.day())
                .then(a.candidate.start.cmp(&b.candidate.start))
                .then(a.branch().cmp(b.branch()))
        });
    }

    /// Entries grouped by (coach, day), each group sorted by start time.
    pub fn by_coach_day(&self) -> BTreeMap<(String, Day), Vec<&ScheduledEntry>> {
        let mut groups: BTreeMap<(String, Day), Vec<&ScheduledEntry>> = BTreeMap::new();
        for e in &self.entries {
            groups
                .entry((e.coach_id().to_string(), e.day()))
                .or_default()
                .push(e);
        }
        for group in groups.values_mut() {
            group.sort_by_key(|e| e.candidate.start);
        }
        groups
    }

    /// Students seated per (branch, level), counting merged seats under
    /// the level they belong to.
    pub fn seated_by_requirement(&self) -> HashMap<RequirementKey, u32> {
        let mut seated = HashMap::new();
        for e in &self.entries {
            for (key, n) in e.seated_by_requirement() {
                *seated.entry(key).or_insert(0) += n;
            }
        }
        seated
    }
}

/// An audit finding against a finished schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Kind of finding.
    pub violation_type: ViolationType,
    /// What the finding is about (a coach, branch or requirement).
    pub subject: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of audit findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Fewer students seated than enrolled for a requirement.
    UnderScheduled,
    /// A class holds more students than its capacity.
    CapacityExceeded,
    /// A coach teaches more classes in a day than allowed.
    DailyClassLimit,
    /// A coach teaches more minutes in a day than allowed.
    DailyMinuteLimit,
    /// A coach teaches more classes in the run than their weekly cap.
    WeeklyClassLimit,
    /// Too many classes in a row without the minimum break.
    ConsecutiveClasses,
    /// A branch runs more concurrent classes than its rooms allow.
    BranchCapacity,
    /// A coach teaches a level they are not qualified for.
    Unqualified,
    /// A coach works at more than one branch in a day.
    MultipleBranches,
    /// A coach has overlapping classes.
    Overlap,
    /// Advisory: same-level classes back to back on a weekday morning
    /// while the earlier one still has seats.
    BackToBackSameLevel,
    /// Advisory: several classes of one level start together at a branch.
    LowDiversity,
    /// Advisory: a merged level is seated with a coach not qualified for it.
    MergedUnqualified,
}

impl ViolationType {
    /// Whether this finding is advisory (a warning, not a failure).
    pub fn is_advisory(self) -> bool {
        matches!(
            self,
            ViolationType::BackToBackSameLevel
                | ViolationType::LowDiversity
                | ViolationType::MergedUnqualified
        )
    }

    /// Default severity for this kind of finding.
    pub fn default_severity(self) -> i32 {
        match self {
            ViolationType::Overlap => 100,
            ViolationType::CapacityExceeded | ViolationType::BranchCapacity => 95,
            ViolationType::DailyClassLimit
            | ViolationType::DailyMinuteLimit
            | ViolationType::WeeklyClassLimit => 90,
            ViolationType::MultipleBranches | ViolationType::Unqualified => 85,
            ViolationType::ConsecutiveClasses => 80,
            ViolationType::UnderScheduled => 60,
            ViolationType::BackToBackSameLevel => 20,
            ViolationType::MergedUnqualified => 30,
            ViolationType::LowDiversity => 10,
        }
    }
}

impl Violation {
    /// Creates a finding with the type's default severity.
    pub fn new(
        violation_type: ViolationType,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            subject: subject.into(),
            message: message.into(),
            severity: violation_type.default_severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClockTime;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn entry(coach: &str, day: Day, start: &str, end: &str, students: u32) -> ScheduledEntry {
        let c = Candidate::new(0, coach, "BB", "L1", day, t(start), t(end)).with_capacity(8);
        ScheduledEntry::new(c, students)
    }

    #[test]
    fn test_entry_capacity() {
        let e = entry("C1", Day::Tue, "10:00", "11:30", 5);
        assert_eq!(e.capacity(), 8);
        assert_eq!(e.spare_capacity(), 3);
        assert!(!e.is_full());
        assert!(!e.is_merged());
        assert_eq!(e.allocations.get("L1"), Some(&5));
    }

    #[test]
    fn test_add_students_never_exceeds_capacity() {
        let mut e = entry("C1", Day::Tue, "10:00", "11:30", 5);
        assert_eq!(e.add_students("L2", 10), 3);
        assert_eq!(e.actual_students, 8);
        assert!(e.is_full());
        assert_eq!(e.add_students("L2", 1), 0);
        assert_eq!(e.allocations.get("L2"), Some(&3));
        assert!(e.is_merged());
        assert_eq!(e.merge_label.as_deref(), Some("L1+L2"));
    }

    #[test]
    fn test_same_level_top_up_is_not_a_merge() {
        let mut e = entry("C1", Day::Tue, "10:00", "11:30", 5);
        assert_eq!(e.add_students("L1", 2), 2);
        assert!(!e.is_merged());
        assert!(e.merge_label.is_none());
        assert_eq!(e.allocations.get("L1"), Some(&7));
    }

    #[test]
    fn test_sort_chronologically() {
        let mut s = Schedule::from_entries(vec![
            entry("C1", Day::Sat, "09:00", "10:00", 1),
            entry("C1", Day::Tue, "15:00", "16:00", 1),
            entry("C2", Day::Tue, "14:00", "15:00", 1),
        ]);
        s.sort_chronologically();
        assert_eq!(s.entries[0].candidate.start, t("14:00"));
        assert_eq!(s.entries[1].candidate.start, t("15:00"));
        assert_eq!(s.entries[2].day(), Day::Sat);
    }

    #[test]
    fn test_seated_by_requirement_counts_merges() {
        let mut e = entry("C1", Day::Tue, "10:00", "11:30", 5);
        e.add_students("L2", 2);
        let s = Schedule::from_entries(vec![e, entry("C2", Day::Wed, "10:00", "11:30", 4)]);
        let seated = s.seated_by_requirement();
        assert_eq!(seated[&RequirementKey::new("BB", "L1")], 9);
        assert_eq!(seated[&RequirementKey::new("BB", "L2")], 2);
    }

    #[test]
    fn test_by_coach_day_groups_sorted() {
        let s = Schedule::from_entries(vec![
            entry("C1", Day::Tue, "16:00", "17:00", 1),
            entry("C1", Day::Tue, "15:00", "16:00", 1),
            entry("C1", Day::Wed, "10:00", "11:00", 1),
        ]);
        let groups = s.by_coach_day();
        let tue = &groups[&("C1".to_string(), Day::Tue)];
        assert_eq!(tue.len(), 2);
        assert_eq!(tue[0].candidate.start, t("15:00"));
    }

    #[test]
    fn test_violation_factories() {
        let v = Violation::new(ViolationType::Overlap, "C1", "overlap on TUE");
        assert_eq!(v.severity, 100);
        assert!(!v.violation_type.is_advisory());
        let w = Violation::new(ViolationType::LowDiversity, "BB", "two L1 at 10:00");
        assert_eq!(w.severity, 10);
        assert!(w.violation_type.is_advisory());
        assert!(ViolationType::MergedUnqualified.is_advisory());
    }
}
