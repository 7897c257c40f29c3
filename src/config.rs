//! Engine configuration.
//!
//! Every tunable of a scheduling run lives in [`SchedulerConfig`], grouped
//! by concern. All fields have defaults, so a TOML file only needs the
//! keys it changes:
//!
//! ```
//! use u_timetable::config::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_toml_str(r#"
//!     [workload]
//!     weekday_daily_classes = 2
//!
//!     [search]
//!     max_iterations = 10
//! "#).unwrap();
//!
//! assert_eq!(config.workload.weekday_daily_classes, 2);
//! assert_eq!(config.workload.weekend_daily_classes, 5);
//! assert_eq!(config.search.max_iterations, 10);
//! ```
//!
//! Unknown keys are rejected, and [`SchedulerConfig::validate`] checks the
//! values before a run starts.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::models::{DayType, EmploymentStatus};

/// Complete configuration of a scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Per-coach daily and weekly caps.
    pub workload: WorkloadLimits,
    /// Level merge rules.
    pub merge: MergePolicy,
    /// Iteration controller settings.
    pub search: SearchSettings,
    /// Candidate scoring constants.
    pub scoring: ScoringWeights,
    /// Demand priority weights.
    pub priority: PriorityWeights,
}

impl SchedulerConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.workload.validate()?;
        self.search.validate()?;
        self.scoring.validate()?;
        self.priority.validate()?;
        Ok(())
    }

    /// Sets the workload limits.
    pub fn with_workload(mut self, workload: WorkloadLimits) -> Self {
        self.workload = workload;
        self
    }

    /// Sets the merge policy.
    pub fn with_merge(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    /// Sets the search settings.
    pub fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }
}

/// Per-coach workload caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadLimits {
    /// Classes per coach per weekday (default 3).
    pub weekday_daily_classes: u32,
    /// Classes per coach per weekend day (default 5).
    pub weekend_daily_classes: u32,
    /// Teaching minutes per coach per weekday (default 240).
    pub weekday_daily_minutes: u32,
    /// Teaching minutes per coach per weekend day (default 480).
    pub weekend_daily_minutes: u32,
    /// Classes per run for full-time coaches (default 25).
    pub full_time_weekly: u32,
    /// Classes per run for part-time coaches (default 15).
    pub part_time_weekly: u32,
    /// Classes per run for branch managers (default 3).
    pub branch_manager_weekly: u32,
    /// Classes allowed in a row without a break (default 3).
    pub consecutive_limit: u32,
    /// Idle minutes that count as a break (default 60).
    pub min_break_minutes: u32,
}

impl Default for WorkloadLimits {
    fn default() -> Self {
        Self {
            weekday_daily_classes: 3,
            weekend_daily_classes: 5,
            weekday_daily_minutes: 240,
            weekend_daily_minutes: 480,
            full_time_weekly: 25,
            part_time_weekly: 15,
            branch_manager_weekly: 3,
            consecutive_limit: 3,
            min_break_minutes: 60,
        }
    }
}

impl WorkloadLimits {
    /// Daily class cap for a day type.
    pub fn daily_classes(&self, day_type: DayType) -> u32 {
        match day_type {
            DayType::Weekday => self.weekday_daily_classes,
            DayType::Weekend => self.weekend_daily_classes,
        }
    }

    /// Daily minute cap for a day type.
    pub fn daily_minutes(&self, day_type: DayType) -> u32 {
        match day_type {
            DayType::Weekday => self.weekday_daily_minutes,
            DayType::Weekend => self.weekend_daily_minutes,
        }
    }

    /// Weekly class cap for an employment status.
    pub fn weekly_cap(&self, status: EmploymentStatus) -> u32 {
        match status {
            EmploymentStatus::FullTime => self.full_time_weekly,
            EmploymentStatus::PartTime => self.part_time_weekly,
            EmploymentStatus::BranchManager => self.branch_manager_weekly,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("workload.weekday_daily_classes", self.weekday_daily_classes),
            ("workload.weekend_daily_classes", self.weekend_daily_classes),
            ("workload.weekday_daily_minutes", self.weekday_daily_minutes),
            ("workload.weekend_daily_minutes", self.weekend_daily_minutes),
            ("workload.consecutive_limit", self.consecutive_limit),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }
        Ok(())
    }
}

/// Rules for combining levels into one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergePolicy {
    /// Maximum hierarchy distance between merged levels (default 1).
    pub level_distance: usize,
    /// Minimum combined gap before a multi-level class is created (default 3).
    pub min_merge_size: u32,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            level_distance: 1,
            min_merge_size: 3,
        }
    }
}

/// Iteration controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    /// Maximum pipeline iterations (default 60).
    pub max_iterations: u32,
    /// Iterations after which the full candidate pool is used instead of
    /// the popular one (default 15).
    pub pool_switch_iteration: u32,
    /// Reshuffle coach and candidate order every N iterations (default 5).
    pub shuffle_interval: u32,
    /// Selection attempts per requirement in the priority fill (default 20).
    pub max_attempts: u32,
    /// Seed for the exploration shuffle (default 42).
    pub seed: u64,
    /// Stop after this many validated results (default 3). A result is
    /// validated when it seats someone, breaks no constraint and fails the
    /// audit on unmet demand at most.
    pub validated_results_to_stop: u32,
    /// Apply the back-to-back penalty and diversity bonus (default true).
    pub advisory_scoring: bool,
    /// Audit every iteration's result (default true).
    pub comprehensive_audit: bool,
    /// Attach per level/coach/branch/day/hour counts (default false).
    pub detailed_breakdown: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: 60,
            pool_switch_iteration: 15,
            shuffle_interval: 5,
            max_attempts: 20,
            seed: 42,
            validated_results_to_stop: 3,
            advisory_scoring: true,
            comprehensive_audit: true,
            detailed_breakdown: false,
        }
    }
}

impl SearchSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "search.max_iterations",
                "must be greater than zero",
            ));
        }
        if self.shuffle_interval == 0 {
            return Err(ConfigError::invalid(
                "search.shuffle_interval",
                "must be greater than zero",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "search.max_attempts",
                "must be greater than zero",
            ));
        }
        if self.validated_results_to_stop == 0 {
            return Err(ConfigError::invalid(
                "search.validated_results_to_stop",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// An inclusive range of start hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourWindow {
    pub first: u32,
    pub last: u32,
}

impl HourWindow {
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    /// Whether `hour` lies in the window.
    pub fn contains(&self, hour: u32) -> bool {
        (self.first..=self.last).contains(&hour)
    }
}

/// Constants of the candidate scoring function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    /// Bonus for popular slots (default 20).
    pub popular_bonus: f64,
    /// Bonus for starting in the peak window (default 15).
    pub peak_hours_bonus: f64,
    /// Bonus for starting in the good window outside the peak (default 10).
    pub good_hours_bonus: f64,
    /// Peak start hours (default 10..=15).
    pub peak_hours: HourWindow,
    /// Good start hours (default 9..=17).
    pub good_hours: HourWindow,
    /// Bias for weekend days (default 5).
    pub weekend_bias: f64,
    /// Bias for weekdays (default 0).
    pub weekday_bias: f64,
    /// Bonus when the coach has fewer than `underutilized_threshold`
    /// classes so far (default 8).
    pub underutilized_bonus: f64,
    /// Class count below which a coach counts as under-utilized (default 5).
    pub underutilized_threshold: u32,
    /// Multiplier applied to the class capacity (default 2).
    pub capacity_multiplier: f64,
    /// Penalty for a same-level class back to back on a weekday morning
    /// (default 25).
    pub back_to_back_penalty: f64,
    /// Bonus when the slot already hosts a different level (default 10).
    pub diversity_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            popular_bonus: 20.0,
            peak_hours_bonus: 15.0,
            good_hours_bonus: 10.0,
            peak_hours: HourWindow::new(10, 15),
            good_hours: HourWindow::new(9, 17),
            weekend_bias: 5.0,
            weekday_bias: 0.0,
            underutilized_bonus: 8.0,
            underutilized_threshold: 5,
            capacity_multiplier: 2.0,
            back_to_back_penalty: 25.0,
            diversity_bonus: 10.0,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> ConfigResult<()> {
        let weights = [
            ("scoring.popular_bonus", self.popular_bonus),
            ("scoring.peak_hours_bonus", self.peak_hours_bonus),
            ("scoring.good_hours_bonus", self.good_hours_bonus),
            ("scoring.weekend_bias", self.weekend_bias),
            ("scoring.weekday_bias", self.weekday_bias),
            ("scoring.underutilized_bonus", self.underutilized_bonus),
            ("scoring.capacity_multiplier", self.capacity_multiplier),
            ("scoring.back_to_back_penalty", self.back_to_back_penalty),
            ("scoring.diversity_bonus", self.diversity_bonus),
        ];
        check_weights(&weights)?;
        for (field, window) in [
            ("scoring.peak_hours", self.peak_hours),
            ("scoring.good_hours", self.good_hours),
        ] {
            if window.first > window.last || window.last > 23 {
                return Err(ConfigError::invalid(
                    field,
                    format!("invalid hour window {}..={}", window.first, window.last),
                ));
            }
        }
        Ok(())
    }
}

/// Weights of the demand priority ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorityWeights {
    /// Weight of coach/slot scarcity (default 0.5).
    pub scarcity: f64,
    /// Weight of level complexity (default 0.3).
    pub complexity: f64,
    /// Weight of enrollment size (default 0.2).
    pub size: f64,
    /// Levels whose complexity is boosted (default Advance, Free).
    pub boosted_levels: Vec<String>,
    /// Complexity added for boosted levels (default 2.0).
    pub advance_level_boost: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            scarcity: 0.5,
            complexity: 0.3,
            size: 0.2,
            boosted_levels: vec!["Advance".to_string(), "Free".to_string()],
            advance_level_boost: 2.0,
        }
    }
}

impl PriorityWeights {
    fn validate(&self) -> ConfigResult<()> {
        check_weights(&[
            ("priority.scarcity", self.scarcity),
            ("priority.complexity", self.complexity),
            ("priority.size", self.size),
            ("priority.advance_level_boost", self.advance_level_boost),
        ])
    }
}

fn check_weights(weights: &[(&'static str, f64)]) -> ConfigResult<()> {
    for &(field, value) in weights {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::invalid(
                field,
                format!("must be a finite non-negative number, got {value}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workload.daily_classes(DayType::Weekday), 3);
        assert_eq!(config.workload.daily_classes(DayType::Weekend), 5);
        assert_eq!(config.workload.daily_minutes(DayType::Weekend), 480);
        assert_eq!(config.workload.weekly_cap(EmploymentStatus::PartTime), 15);
        assert_eq!(config.merge.min_merge_size, 3);
        assert_eq!(config.search.pool_switch_iteration, 15);
        assert!((config.priority.scarcity - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SchedulerConfig::from_toml_str(
            r#"
            [scoring]
            popular_bonus = 30.0
            peak_hours = { first = 11, last = 14 }

            [merge]
            level_distance = 2
            "#,
        )
        .unwrap();
        assert!((config.scoring.popular_bonus - 30.0).abs() < 1e-10);
        assert!(config.scoring.peak_hours.contains(11));
        assert!(!config.scoring.peak_hours.contains(10));
        assert_eq!(config.merge.level_distance, 2);
        assert_eq!(config.merge.min_merge_size, 3);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SchedulerConfig::from_toml_str("[search]\nmax_iteration = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = SchedulerConfig::from_toml_str("[search]\nmax_iterations = 0\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "search.max_iterations"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = SchedulerConfig::default();
        config.priority.size = -1.0;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.scoring.diversity_bonus = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_hour_window_rejected() {
        let mut config = SchedulerConfig::default();
        config.scoring.good_hours = HourWindow::new(18, 9);
        assert!(config.validate().is_err());
    }
}
