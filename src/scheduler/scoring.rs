//! Candidate scoring.
//!
//! Ranks constraint-valid candidates for the same demand; it never rejects.
//! The score is a sum of components:
//! - **Popularity**: bonus for historically high-demand slots
//! - **Time of day**: peak hours first, then good hours
//! - **Day bias**: weekend/weekday preference
//! - **Utilization**: bonus while the coach is under-used
//! - **Capacity**: proportional to class size
//! - **Back to back** (advisory): penalty for a same-level class at the same
//!   branch right before or after, on a weekday morning
//! - **Diversity** (advisory): bonus when the start time already hosts a
//!   different level at the branch

use super::state::SchedulingState;
use crate::config::ScoringWeights;
use crate::models::{Candidate, Catalog, DayType, Period};

/// Individual score components for debugging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub popularity: f64,
    pub time_of_day: f64,
    pub day_bias: f64,
    pub utilization: f64,
    pub capacity: f64,
    /// Zero or negative.
    pub back_to_back: f64,
    pub diversity: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.popularity
            + self.time_of_day
            + self.day_bias
            + self.utilization
            + self.capacity
            + self.back_to_back
            + self.diversity
    }
}

/// Scores candidates against a state.
#[derive(Debug, Clone)]
pub struct ScoringFunction<'a> {
    weights: &'a ScoringWeights,
    catalog: &'a Catalog,
    min_break_minutes: u32,
    advisory: bool,
}

impl<'a> ScoringFunction<'a> {
    pub fn new(weights: &'a ScoringWeights, catalog: &'a Catalog, min_break_minutes: u32) -> Self {
        Self {
            weights,
            catalog,
            min_break_minutes,
            advisory: true,
        }
    }

    /// Enables or disables the back-to-back and diversity components.
    pub fn with_advisory(mut self, advisory: bool) -> Self {
        self.advisory = advisory;
        self
    }

    /// Total score; higher is better.
    pub fn score(&self, candidate: &Candidate, state: &SchedulingState) -> f64 {
        self.breakdown(candidate, state).total()
    }

    pub fn breakdown(&self, candidate: &Candidate, state: &SchedulingState) -> ScoreBreakdown {
        let w = self.weights;
        let hour = candidate.start.hour();
        let day_type = self.catalog.day_type(candidate.day);

        let time_of_day = if w.peak_hours.contains(hour) {
            w.peak_hours_bonus
        } else if w.good_hours.contains(hour) {
            w.good_hours_bonus
        } else {
            0.0
        };

        let utilization = if state.weekly_classes(&candidate.coach_id) < w.underutilized_threshold {
            w.underutilized_bonus
        } else {
            0.0
        };

        let mut breakdown = ScoreBreakdown {
            popularity: if candidate.is_popular {
                w.popular_bonus
            } else {
                0.0
            },
            time_of_day,
            day_bias: match day_type {
                DayType::Weekend => w.weekend_bias,
                DayType::Weekday => w.weekday_bias,
            },
            utilization,
            capacity: f64::from(candidate.capacity) * w.capacity_multiplier,
            ..Default::default()
        };

        if self.advisory {
            if self.is_back_to_back(candidate, state) {
                breakdown.back_to_back = -w.back_to_back_penalty;
            }
            let diverse = state
                .levels_at(&candidate.branch, candidate.day, candidate.start)
                .is_some_and(|levels| levels.iter().any(|l| *l != candidate.level));
            if diverse {
                breakdown.diversity = w.diversity_bonus;
            }
        }

        breakdown
    }

    /// Whether a same-level class at the branch ends or starts within the
    /// minimum break of this weekday-morning candidate.
    fn is_back_to_back(&self, candidate: &Candidate, state: &SchedulingState) -> bool {
        if self.catalog.day_type(candidate.day) != DayType::Weekday
            || candidate.period != Period::Morning
        {
            return false;
        }
        let interval = candidate.interval();
        let min_break = i64::from(self.min_break_minutes);
        state
            .level_intervals(&candidate.branch, candidate.day, &candidate.level)
            .iter()
            .any(|other| {
                let gap = interval.gap_minutes(other);
                (0..min_break).contains(&gap)
            })
    }
}
