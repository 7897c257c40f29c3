//! Catalog of static business data.
//!
//! Level capacities and durations, branch room limits, the level
//! hierarchy used for complexity and merge compatibility, and the split of
//! operating days into weekdays and weekends.
//!
//! `Catalog::default()` is the gymnastics academy catalog the engine was
//! built around; callers with other data supply their own.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{Day, DayType};

/// Class size used when a level has no configured capacity.
pub const DEFAULT_LEVEL_CAPACITY: u32 = 8;
/// Concurrent classes per 30-minute slot when a branch has no configured limit.
pub const DEFAULT_BRANCH_LIMIT: u32 = 4;
/// Complexity of a level missing from the hierarchy.
pub const UNKNOWN_LEVEL_COMPLEXITY: f64 = 0.5;

/// Static scheduling data shared read-only by every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Maximum students per class, by level.
    pub level_capacities: HashMap<String, u32>,
    /// Class length in minutes, by level.
    pub level_durations: HashMap<String, u32>,
    /// Maximum concurrent classes per 30-minute slot, by branch.
    pub branch_limits: HashMap<String, u32>,
    /// Levels from most basic to most advanced.
    pub level_hierarchy: Vec<String>,
    /// Operating days counted as weekdays.
    pub weekdays: BTreeSet<Day>,
    /// Operating days counted as weekend days.
    pub weekends: BTreeSet<Day>,
}

impl Default for Catalog {
    fn default() -> Self {
        let hierarchy = [
            "Tots", "Jolly", "Bubbly", "Lively", "Flexi", "L1", "L2", "L3", "L4", "Advance",
            "Free",
        ];
        let mut level_capacities = HashMap::new();
        let mut level_durations = HashMap::new();
        for level in hierarchy {
            let capacity = match level {
                "Tots" => 7,
                "L2" => 9,
                "L3" | "L4" | "Advance" | "Free" => 10,
                _ => 8,
            };
            let duration = match level {
                "Tots" | "Jolly" | "Bubbly" | "Lively" | "Flexi" => 60,
                _ => 90,
            };
            level_capacities.insert(level.to_string(), capacity);
            level_durations.insert(level.to_string(), duration);
        }

        Self {
            level_capacities,
            level_durations,
            branch_limits: HashMap::new(),
            level_hierarchy: hierarchy.iter().map(|l| l.to_string()).collect(),
            weekdays: [Day::Tue, Day::Wed, Day::Thu, Day::Fri].into_iter().collect(),
            weekends: [Day::Sat, Day::Sun].into_iter().collect(),
        }
    }
}

impl Catalog {
    /// Creates an empty catalog (every lookup falls back to defaults).
    pub fn empty() -> Self {
        Self {
            level_capacities: HashMap::new(),
            level_durations: HashMap::new(),
            branch_limits: HashMap::new(),
            level_hierarchy: Vec::new(),
            weekdays: BTreeSet::new(),
            weekends: BTreeSet::new(),
        }
    }

    /// Sets a level's capacity and duration.
    pub fn with_level(mut self, level: impl Into<String>, capacity: u32, duration: u32) -> Self {
        let level = level.into();
        self.level_capacities.insert(level.clone(), capacity);
        self.level_durations.insert(level, duration);
        self
    }

    /// Sets a branch's concurrent class limit.
    pub fn with_branch_limit(mut self, branch: impl Into<String>, limit: u32) -> Self {
        self.branch_limits.insert(branch.into(), limit);
        self
    }

    /// Replaces the level hierarchy.
    pub fn with_hierarchy<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.level_hierarchy = levels.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the weekday and weekend sets.
    pub fn with_days(mut self, weekdays: &[Day], weekends: &[Day]) -> Self {
        self.weekdays = weekdays.iter().copied().collect();
        self.weekends = weekends.iter().copied().collect();
        self
    }

    /// Maximum students per class for a level.
    pub fn capacity(&self, level: &str) -> u32 {
        self.level_capacities
            .get(level)
            .copied()
            .unwrap_or(DEFAULT_LEVEL_CAPACITY)
    }

    /// Class duration in minutes for a level, if known.
    pub fn duration(&self, level: &str) -> Option<u32> {
        self.level_durations.get(level).copied()
    }

    /// Concurrent class limit per 30-minute slot for a branch.
    pub fn branch_limit(&self, branch: &str) -> u32 {
        self.branch_limits
            .get(branch)
            .copied()
            .unwrap_or(DEFAULT_BRANCH_LIMIT)
    }

    /// Position of a level in the hierarchy.
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.level_hierarchy.iter().position(|l| l == level)
    }

    /// Hierarchy position normalised to [0, 1).
    pub fn complexity(&self, level: &str) -> f64 {
        match self.level_index(level) {
            Some(idx) => idx as f64 / self.level_hierarchy.len() as f64,
            None => UNKNOWN_LEVEL_COMPLEXITY,
        }
    }

    /// Whether two levels may share a class.
    ///
    /// A level is always compatible with itself; distinct levels must both
    /// appear in the hierarchy at most `max_distance` positions apart.
    pub fn levels_compatible(&self, a: &str, b: &str, max_distance: usize) -> bool {
        if a == b {
            return true;
        }
        match (self.level_index(a), self.level_index(b)) {
            (Some(ia), Some(ib)) => ia.abs_diff(ib) <= max_distance,
            _ => false,
        }
    }

    /// Weekday/weekend classification. Days in neither set count as weekdays.
    pub fn day_type(&self, day: Day) -> DayType {
        if self.weekends.contains(&day) {
            DayType::Weekend
        } else {
            DayType::Weekday
        }
    }

    /// Whether the day is a configured weekday.
    pub fn is_weekday(&self, day: Day) -> bool {
        self.day_type(day) == DayType::Weekday
    }

    /// Operating days (weekdays and weekends) in calendar order.
    pub fn operating_days(&self) -> Vec<Day> {
        self.weekdays.union(&self.weekends).copied().collect()
    }

    /// Mean of the configured level capacities.
    pub fn average_capacity(&self) -> f64 {
        if self.level_capacities.is_empty() {
            return f64::from(DEFAULT_LEVEL_CAPACITY);
        }
        let sum: u32 = self.level_capacities.values().sum();
        f64::from(sum) / self.level_capacities.len() as f64
    }
}
