//! Iteration controller.
//!
//! Runs the phase pipeline repeatedly on fresh states, keeping the best
//! result with zero violations.
//!
//! # Algorithm
//!
//! For each iteration (1-based):
//! 1. Pick the pool: popular candidates until `pool_switch_iteration`,
//!    then every candidate
//! 2. Run the six phases on a fresh [`SchedulingState`]
//! 3. Re-derive violation counts from the produced entries
//! 4. Accept the result as best if it has no violations and strictly
//!    higher coverage
//! 5. Audit it; a result that seats someone and whose only hard finding
//!    is unmet demand is a validated result
//! 6. Stop on full coverage, or once enough validated results were seen
//! 7. Every `shuffle_interval` iterations, reshuffle the pools and the
//!    coach order within each employment status
//!
//! The final result is the best validated one, else the best
//! zero-violation one, else a single best-effort pass.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use super::phases::{PhaseCoverage, PhasePipeline};
use super::result::ScheduleResult;
use super::scoring::ScoringFunction;
use super::state::SchedulingState;
use super::validator::{exceeds_consecutive_limit, ConstraintValidator};
use crate::config::{SchedulerConfig, WorkloadLimits};
use crate::dispatching::{RankingContext, RuleEngine};
use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Candidate, Catalog, Coach, Schedule, ScheduledEntry, SchedulingProblem};
use crate::validation::{validate_input, AuditReport, AuditStatus, ComprehensiveValidator};

/// Which candidate pool an iteration read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    Popular,
    All,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoolKind::Popular => "popular",
            PoolKind::All => "all",
        })
    }
}

/// How the final result was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Best result that also passed the audit.
    Validated,
    /// Best result without hard or workload violations.
    ZeroViolation,
    /// Single best-effort pass; no iteration produced a usable result.
    Fallback,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Selection::Validated => "validated",
            Selection::ZeroViolation => "zero-violation",
            Selection::Fallback => "fallback",
        })
    }
}

/// Violation counts re-derived from a finished schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    /// Over-capacity classes, plus (coach, day) pairs at several branches
    /// or breaking the consecutive-class rule.
    pub hard: usize,
    /// (coach, day) pairs over the daily class limit.
    pub workload: usize,
}

impl ViolationCounts {
    pub fn derive(entries: &[ScheduledEntry], catalog: &Catalog, limits: &WorkloadLimits) -> Self {
        let mut counts = Self {
            hard: entries
                .iter()
                .filter(|e| e.actual_students > e.capacity())
                .count(),
            workload: 0,
        };

        let schedule = Schedule::from_entries(entries.to_vec());
        for ((_, day), group) in schedule.by_coach_day() {
            if group.iter().any(|e| e.branch() != group[0].branch()) {
                counts.hard += 1;
            }
            let intervals: Vec<_> = group.iter().map(|e| e.interval()).collect();
            if exceeds_consecutive_limit(&intervals, limits) {
                counts.hard += 1;
            }
            if group.len() as u32 > limits.daily_classes(catalog.day_type(day)) {
                counts.workload += 1;
            }
        }
        counts
    }

    pub fn is_clean(&self) -> bool {
        self.hard == 0 && self.workload == 0
    }
}

/// One iteration's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub pool: PoolKind,
    pub coverage: f64,
    pub classes: usize,
    pub violations: ViolationCounts,
    pub audit_status: Option<AuditStatus>,
    pub phases: Vec<PhaseCoverage>,
}

/// Final result of a run plus its trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub result: ScheduleResult,
    pub chosen_by: Selection,
    pub iterations: u32,
    pub summaries: Vec<IterationSummary>,
}

/// Pre-run view of one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementAnalysis {
    pub branch: String,
    pub level: String,
    pub students: u32,
    pub qualified_coaches: usize,
    pub popular_candidates: usize,
    pub total_candidates: usize,
    /// Composite demand priority; higher is scheduled first.
    pub priority: f64,
}

impl RequirementAnalysis {
    /// Demand with no coach or no slot at all.
    pub fn is_critical(&self) -> bool {
        self.students > 0 && (self.qualified_coaches == 0 || self.total_candidates == 0)
    }
}

/// Pre-run analysis of demand against coach capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityAnalysis {
    pub requirements: Vec<RequirementAnalysis>,
    /// Upper bound on seats under the workload limits.
    pub theoretical_capacity: u32,
    pub total_required: u32,
}

impl CapacityAnalysis {
    pub fn is_sufficient(&self) -> bool {
        self.theoretical_capacity >= self.total_required
    }
}

/// The scheduling engine.
///
/// # Example
/// ```
/// use u_timetable::config::SchedulerConfig;
/// use u_timetable::models::{Candidate, Catalog, Coach, Day, Requirement, SchedulingProblem};
/// use u_timetable::scheduler::StrictScheduler;
///
/// let problem = SchedulingProblem::new(Catalog::default())
///     .with_coach(
///         Coach::full_time("C1")
///             .with_qualification("L1")
///             .with_branch("BB")
///             .available_on(&[Day::Sat]),
///     )
///     .with_requirement(Requirement::new("BB", "L1", 8))
///     .with_candidate(
///         Candidate::new(1, "C1", "BB", "L1", Day::Sat, "10:00".parse().unwrap(), "11:30".parse().unwrap())
///             .with_capacity(8),
///     );
///
/// let scheduler = StrictScheduler::new(problem, SchedulerConfig::default()).unwrap();
/// let outcome = scheduler.run();
/// assert!(outcome.result.statistics.perfect_coverage);
/// ```
#[derive(Debug, Clone)]
pub struct StrictScheduler {
    problem: SchedulingProblem,
    config: SchedulerConfig,
    ranking: RankingContext,
}

impl StrictScheduler {
    /// Validates the configuration and the problem.
    pub fn new(problem: SchedulingProblem, config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        validate_input(&problem).map_err(SchedulerError::InvalidInput)?;
        let ranking = RankingContext::from_problem(&problem);
        Ok(Self {
            problem,
            config,
            ranking,
        })
    }

    pub fn problem(&self) -> &SchedulingProblem {
        &self.problem
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Per-requirement coach and slot counts, and the theoretical capacity.
    pub fn analysis(&self) -> CapacityAnalysis {
        let priority = RuleEngine::demand_priority(&self.config.priority);
        let requirements = self
            .problem
            .requirements
            .iter()
            .map(|req| {
                let serving = |c: &&Candidate| c.serves(&req.branch, &req.level);
                RequirementAnalysis {
                    branch: req.branch.clone(),
                    level: req.level.clone(),
                    students: req.students,
                    qualified_coaches: self.problem.qualified_coaches(&req.branch, &req.level).count(),
                    popular_candidates: self
                        .problem
                        .candidates
                        .iter()
                        .filter(serving)
                        .filter(|c| c.is_popular)
                        .count(),
                    total_candidates: self.problem.candidates.iter().filter(serving).count(),
                    priority: priority.priority(&req.key(), &self.ranking),
                }
            })
            .collect();

        CapacityAnalysis {
            requirements,
            theoretical_capacity: self.theoretical_capacity(),
            total_required: self.problem.total_required(),
        }
    }

    /// Σ per coach of min(daily limits over the operating days, weekly cap),
    /// times the average level capacity.
    fn theoretical_capacity(&self) -> u32 {
        let catalog = &self.problem.catalog;
        let limits = &self.config.workload;
        let per_week: u32 = catalog
            .operating_days()
            .into_iter()
            .map(|d| limits.daily_classes(catalog.day_type(d)))
            .sum();
        let classes: u32 = self
            .problem
            .coaches
            .iter()
            .map(|c| per_week.min(limits.weekly_cap(c.status)))
            .sum();
        (f64::from(classes) * catalog.average_capacity()) as u32
    }

    /// Runs the search.
    pub fn run(&self) -> ScheduleOutcome {
        let analysis = self.analysis();
        info!(
            requirements = analysis.requirements.len(),
            coaches = self.problem.coaches.len(),
            candidates = self.problem.candidates.len(),
            required = analysis.total_required,
            theoretical_capacity = analysis.theoretical_capacity,
            "starting scheduling run"
        );
        if !analysis.is_sufficient() {
            warn!(
                required = analysis.total_required,
                theoretical_capacity = analysis.theoretical_capacity,
                "theoretical capacity below demand"
            );
        }
        for req in analysis.requirements.iter().filter(|r| r.is_critical()) {
            warn!(branch = %req.branch, level = %req.level, students = req.students, "critical shortage");
        }

        let catalog = &self.problem.catalog;
        let search = &self.config.search;
        let validator = ConstraintValidator::new(&self.problem.coaches, catalog, &self.config.workload);
        let scoring = ScoringFunction::new(
            &self.config.scoring,
            catalog,
            self.config.workload.min_break_minutes,
        )
        .with_advisory(search.advisory_scoring);
        let auditor = ComprehensiveValidator::new(&self.problem, &self.config.workload);

        let mut all_pool = self.problem.candidates.clone();
        let mut popular_pool = self.problem.popular_candidates();
        let mut coaches: Vec<&Coach> = self.problem.coaches.iter().collect();
        coaches.sort_by_key(|c| c.status);
        let mut rng = SmallRng::seed_from_u64(search.seed);

        let mut best: Option<ScheduleResult> = None;
        let mut best_coverage = 0.0;
        let mut validated: Option<ScheduleResult> = None;
        let mut validated_count = 0;
        let mut summaries = Vec::new();
        let mut iterations = 0;

        for iteration in 1..=search.max_iterations {
            iterations = iteration;
            let pool_kind = if iteration > search.pool_switch_iteration || popular_pool.is_empty() {
                PoolKind::All
            } else {
                PoolKind::Popular
            };
            let pool = match pool_kind {
                PoolKind::Popular => popular_pool.as_slice(),
                PoolKind::All => all_pool.as_slice(),
            };

            let pipeline = PhasePipeline::new(
                catalog,
                &self.config,
                &validator,
                &scoring,
                &self.ranking,
                &coaches,
                pool,
            );
            let mut state = SchedulingState::new(&self.problem.requirements);
            let phases = pipeline.run(&mut state);
            let counts = ViolationCounts::derive(state.entries(), catalog, &self.config.workload);

            let mut result = ScheduleResult::build(state.into_entries(), &self.problem);
            if search.comprehensive_audit {
                let report = auditor.audit(&result.schedule);
                result = result.with_audit(report);
            }
            let coverage = result.coverage();

            info!(
                iteration,
                pool = %pool_kind,
                coverage,
                classes = result.schedule.len(),
                hard_violations = counts.hard,
                workload_violations = counts.workload,
                "iteration complete"
            );
            summaries.push(IterationSummary {
                iteration,
                pool: pool_kind,
                coverage,
                classes: result.schedule.len(),
                violations: counts,
                audit_status: result.audit.as_ref().map(|a| a.status),
                phases,
            });

            if !counts.is_clean() {
                debug!(iteration, hard = counts.hard, workload = counts.workload, "result rejected");
            } else if coverage > best_coverage {
                debug!(iteration, coverage, "new best result");
                best_coverage = coverage;
                best = Some(result.clone());
            }

            let audited = coverage > 0.0
                && counts.is_clean()
                && result.audit.as_ref().is_some_and(AuditReport::is_feasible);
            if audited {
                validated_count += 1;
                if validated.as_ref().is_none_or(|v| coverage > v.coverage()) {
                    validated = Some(result);
                }
            }

            if coverage >= 100.0 && counts.is_clean() {
                info!(iteration, "full coverage with zero violations");
                break;
            }
            if validated_count >= search.validated_results_to_stop {
                info!(iteration, validated = validated_count, "enough validated results");
                break;
            }
            if iteration % search.shuffle_interval == 0 {
                all_pool.shuffle(&mut rng);
                popular_pool.shuffle(&mut rng);
                coaches.shuffle(&mut rng);
                coaches.sort_by_key(|c| c.status);
                debug!(iteration, "reshuffled candidates and coaches");
            }
        }

        let (result, chosen_by) = match (validated, best) {
            (Some(result), _) => (result, Selection::Validated),
            (None, Some(result)) => (result, Selection::ZeroViolation),
            (None, None) => {
                warn!("no zero-violation result found, using best-effort pass");
                (self.best_effort(&validator, &scoring, &auditor), Selection::Fallback)
            }
        };
        let result = if search.detailed_breakdown {
            result.with_breakdown()
        } else {
            result
        };

        info!(
            coverage = result.coverage(),
            classes = result.schedule.len(),
            unassigned = result.unassigned_students(),
            chosen_by = %chosen_by,
            audit_passed = result.audit.as_ref().map(AuditReport::passed),
            iterations,
            "scheduling run complete"
        );

        ScheduleOutcome {
            result,
            chosen_by,
            iterations,
            summaries,
        }
    }

    /// One class per requirement over every candidate.
    fn best_effort(
        &self,
        validator: &ConstraintValidator<'_>,
        scoring: &ScoringFunction<'_>,
        auditor: &ComprehensiveValidator<'_>,
    ) -> ScheduleResult {
        let mut coaches: Vec<&Coach> = self.problem.coaches.iter().collect();
        coaches.sort_by_key(|c| c.status);
        let pipeline = PhasePipeline::new(
            &self.problem.catalog,
            &self.config,
            validator,
            scoring,
            &self.ranking,
            &coaches,
            &self.problem.candidates,
        );
        let mut state = SchedulingState::new(&self.problem.requirements);
        pipeline.single_pass(&mut state);

        let result = ScheduleResult::build(state.into_entries(), &self.problem);
        if self.config.search.comprehensive_audit {
            let report = auditor.audit(&result.schedule);
            result.with_audit(report)
        } else {
            result
        }
    }
}
