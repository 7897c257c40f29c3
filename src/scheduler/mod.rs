//! Strict-constraint scheduler and schedule statistics.
//!
//! # Algorithm
//!
//! [`StrictScheduler`] runs a six-phase greedy pipeline ([`PhasePipeline`])
//! many times over reshuffled candidate pools and keeps the best result
//! with no violations. Every commit goes through [`ConstraintValidator`];
//! [`ScoringFunction`] only ranks valid candidates.
//!
//! The result is a heuristic schedule, not a proven optimum.
//!
//! # Statistics
//!
//! [`ScheduleStatistics`] reports coverage, coach utilization per
//! employment status, popular slot use and merged classes.
//! [`ScheduleBreakdown`] adds per level, branch, coach, day and hour counts.

mod engine;
mod kpi;
mod phases;
mod result;
mod scoring;
mod state;
mod validator;

pub use engine::{
    CapacityAnalysis, IterationSummary, PoolKind, RequirementAnalysis, ScheduleOutcome,
    Selection, StrictScheduler, ViolationCounts,
};
pub use kpi::{coverage, CoachUtilization, GroupCount, ScheduleBreakdown, ScheduleStatistics};
pub use phases::{distribute_seats, CandidateIndex, Phase, PhaseCoverage, PhasePipeline};
pub use result::{CriticalGap, GapReason, ScheduleResult};
pub use scoring::{ScoreBreakdown, ScoringFunction};
pub use state::{
    BranchCellKey, CoachDayKey, CoachDayLoad, DemandLedger, LevelDayKey, SchedulingState, SlotKey,
};
pub use validator::{exceeds_consecutive_limit, ConstraintValidator, Rejection};
