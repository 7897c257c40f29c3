//! Mutable scheduling state of one iteration.
//!
//! The state owns the committed entries plus the indexes the validator and
//! the scoring function query. Every index is keyed by an explicit tuple
//! type. Entries are only ever added or topped up; nothing is removed.
//!
//! Mutation is crate-private: the phase pipeline validates a candidate
//! before calling [`SchedulingState::record`].

use std::collections::{BTreeSet, HashMap};

use crate::models::{
    Candidate, ClockTime, Day, Interval, Requirement, RequirementKey, ScheduledEntry,
};

/// A coach on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoachDayKey {
    pub coach: String,
    pub day: Day,
}

impl CoachDayKey {
    pub fn new(coach: &str, day: Day) -> Self {
        Self {
            coach: coach.to_string(),
            day,
        }
    }
}

/// One 30-minute grid cell at a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchCellKey {
    pub branch: String,
    pub day: Day,
    pub cell: u32,
}

/// One level at a branch on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelDayKey {
    pub branch: String,
    pub day: Day,
    pub level: String,
}

/// A start time at a branch on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub branch: String,
    pub day: Day,
    pub start: ClockTime,
}

/// A coach's committed load on one day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoachDayLoad {
    pub classes: u32,
    pub minutes: u32,
    /// Branch the coach works at that day.
    pub branch: Option<String>,
    /// Committed intervals, in commit order.
    pub intervals: Vec<Interval>,
}

/// Required and remaining students per (branch, level).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandLedger {
    order: Vec<RequirementKey>,
    required: HashMap<RequirementKey, u32>,
    remaining: HashMap<RequirementKey, u32>,
}

impl DemandLedger {
    /// Builds the ledger; keys keep their input order.
    pub fn from_requirements(requirements: &[Requirement]) -> Self {
        let mut ledger = Self::default();
        for req in requirements {
            let key = req.key();
            if !ledger.required.contains_key(&key) {
                ledger.order.push(key.clone());
            }
            *ledger.required.entry(key.clone()).or_insert(0) += req.students;
            *ledger.remaining.entry(key).or_insert(0) += req.students;
        }
        ledger
    }

    /// Requirement keys in input order.
    pub fn keys(&self) -> &[RequirementKey] {
        &self.order
    }

    pub fn required(&self, key: &RequirementKey) -> u32 {
        self.required.get(key).copied().unwrap_or(0)
    }

    pub fn remaining(&self, key: &RequirementKey) -> u32 {
        self.remaining.get(key).copied().unwrap_or(0)
    }

    /// Remaining gaps > 0, in input order.
    pub fn gaps(&self) -> Vec<(RequirementKey, u32)> {
        self.order
            .iter()
            .filter_map(|k| {
                let gap = self.remaining(k);
                (gap > 0).then(|| (k.clone(), gap))
            })
            .collect()
    }

    /// Remaining students per key, for ranking.
    pub fn remaining_map(&self) -> &HashMap<RequirementKey, u32> {
        &self.remaining
    }

    pub fn total_required(&self) -> u32 {
        self.required.values().sum()
    }

    pub fn total_remaining(&self) -> u32 {
        self.remaining.values().sum()
    }

    pub fn total_scheduled(&self) -> u32 {
        self.total_required() - self.total_remaining()
    }

    /// Whether every requirement is fully seated.
    pub fn is_satisfied(&self) -> bool {
        self.total_remaining() == 0
    }

    /// Deducts up to `students` from a requirement; returns the amount deducted.
    pub(crate) fn seat(&mut self, key: &RequirementKey, students: u32) -> u32 {
        match self.remaining.get_mut(key) {
            Some(left) => {
                let seated = students.min(*left);
                *left -= seated;
                seated
            }
            None => 0,
        }
    }
}

/// Mutable state of one iteration.
#[derive(Debug, Clone, Default)]
pub struct SchedulingState {
    entries: Vec<ScheduledEntry>,
    coach_days: HashMap<CoachDayKey, CoachDayLoad>,
    coach_week: HashMap<String, u32>,
    branch_cells: HashMap<BranchCellKey, u32>,
    level_intervals: HashMap<LevelDayKey, Vec<Interval>>,
    slot_levels: HashMap<SlotKey, BTreeSet<String>>,
    ledger: DemandLedger,
}

impl SchedulingState {
    /// Fresh state with the full demand outstanding.
    pub fn new(requirements: &[Requirement]) -> Self {
        Self {
            ledger: DemandLedger::from_requirements(requirements),
            ..Default::default()
        }
    }

    /// Committed entries in commit order.
    pub fn entries(&self) -> &[ScheduledEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ScheduledEntry> {
        self.entries
    }

    pub fn ledger(&self) -> &DemandLedger {
        &self.ledger
    }

    /// A coach's load on a day, if they teach that day.
    pub fn coach_day(&self, coach: &str, day: Day) -> Option<&CoachDayLoad> {
        self.coach_days.get(&CoachDayKey::new(coach, day))
    }

    pub fn classes_on(&self, coach: &str, day: Day) -> u32 {
        self.coach_day(coach, day).map_or(0, |l| l.classes)
    }

    /// Classes committed for a coach across the run.
    pub fn weekly_classes(&self, coach: &str) -> u32 {
        self.coach_week.get(coach).copied().unwrap_or(0)
    }

    /// Concurrent classes in one grid cell at a branch.
    pub fn branch_usage(&self, branch: &str, day: Day, cell: u32) -> u32 {
        let key = BranchCellKey {
            branch: branch.to_string(),
            day,
            cell,
        };
        self.branch_cells.get(&key).copied().unwrap_or(0)
    }

    /// Intervals of committed classes of one level at a branch on a day.
    pub fn level_intervals(&self, branch: &str, day: Day, level: &str) -> &[Interval] {
        let key = LevelDayKey {
            branch: branch.to_string(),
            day,
            level: level.to_string(),
        };
        self.level_intervals
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Levels already starting at (branch, day, start).
    pub fn levels_at(&self, branch: &str, day: Day, start: ClockTime) -> Option<&BTreeSet<String>> {
        let key = SlotKey {
            branch: branch.to_string(),
            day,
            start,
        };
        self.slot_levels.get(&key)
    }

    /// Scheduled / required, as a percentage (0 when nothing is required).
    pub fn coverage(&self) -> f64 {
        let required = self.ledger.total_required();
        if required == 0 {
            return 0.0;
        }
        f64::from(self.ledger.total_scheduled()) / f64::from(required) * 100.0
    }

    /// Commits a validated candidate as a new class.
    ///
    /// `seats` lists (level, students) charged to this class's branch; the
    /// candidate's own level should come first. Returns the entry index.
    pub(crate) fn record(&mut self, candidate: &Candidate, seats: &[(String, u32)]) -> usize {
        let mut entry = ScheduledEntry::new(candidate.clone(), 0);
        for (level, students) in seats {
            let key = RequirementKey::new(&candidate.branch, level);
            let charged = self.ledger.seat(&key, *students);
            entry.add_students(level, charged);
            entry.record_level(level);
        }

        let interval = candidate.interval();
        let load = self
            .coach_days
            .entry(CoachDayKey::new(&candidate.coach_id, candidate.day))
            .or_default();
        load.classes += 1;
        load.minutes += candidate.duration_minutes;
        load.branch = Some(candidate.branch.clone());
        load.intervals.push(interval);

        *self.coach_week.entry(candidate.coach_id.clone()).or_insert(0) += 1;

        for cell in interval.half_hour_cells() {
            let key = BranchCellKey {
                branch: candidate.branch.clone(),
                day: candidate.day,
                cell,
            };
            *self.branch_cells.entry(key).or_insert(0) += 1;
        }

        self.level_intervals
            .entry(LevelDayKey {
                branch: candidate.branch.clone(),
                day: candidate.day,
                level: candidate.level.clone(),
            })
            .or_default()
            .push(interval);

        let slot = self
            .slot_levels
            .entry(SlotKey {
                branch: candidate.branch.clone(),
                day: candidate.day,
                start: candidate.start,
            })
            .or_default();
        for level in &entry.merged_levels {
            slot.insert(level.clone());
        }

        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Seats up to `students` of `level` in an existing class.
    ///
    /// Never exceeds the class capacity or the level's remaining demand.
    /// Returns the number seated.
    pub(crate) fn top_up(&mut self, index: usize, level: &str, students: u32) -> u32 {
        let Some(entry) = self.entries.get(index) else {
            return 0;
        };
        let key = RequirementKey::new(entry.branch(), level);
        let wanted = students
            .min(entry.spare_capacity())
            .min(self.ledger.remaining(&key));
        if wanted == 0 {
            return 0;
        }
        let charged = self.ledger.seat(&key, wanted);
        let Some(entry) = self.entries.get_mut(index) else {
            return 0;
        };
        let seated = entry.add_students(level, charged);
        let slot = SlotKey {
            branch: entry.candidate.branch.clone(),
            day: entry.candidate.day,
            start: entry.candidate.start,
        };
        self.slot_levels
            .entry(slot)
            .or_default()
            .insert(level.to_string());
        seated
    }
}
