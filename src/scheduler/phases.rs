//! Six-phase pipeline.
//!
//! Each phase attacks the remaining demand of one [`SchedulingState`] with
//! its own strategy. Phases only add classes or seat more students in
//! existing ones, so coverage never decreases from one phase to the next.
//!
//! # Algorithm
//!
//! 1. **Priority fill**: requirements in composite priority order; the best
//!    scoring valid candidate among qualified coaches, repeatedly.
//! 2. **Gap fill**: remaining gaps, largest first; one class per qualified
//!    coach.
//! 3. **Level merge**: seat remaining students in existing classes of a
//!    compatible level at the same branch.
//! 4. **Multi-level merge**: one new class for a pair of compatible levels
//!    whose combined gap is large enough.
//! 5. **Exhaustive fill**: at most one extra class per (coach, day).
//! 6. **Maximum utilization**: as phase 5, but until the daily cap is hit.
//!
//! Every new class goes through [`ConstraintValidator::check`] first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

use super::scoring::ScoringFunction;
use super::state::SchedulingState;
use super::validator::ConstraintValidator;
use crate::config::SchedulerConfig;
use crate::dispatching::{RankingContext, RuleEngine};
use crate::models::{Candidate, Catalog, Coach, Day, RequirementKey};

/// The six phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PriorityFill,
    GapFill,
    LevelMerge,
    MultiLevelMerge,
    ExhaustiveFill,
    MaximumUtilization,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::PriorityFill,
        Phase::GapFill,
        Phase::LevelMerge,
        Phase::MultiLevelMerge,
        Phase::ExhaustiveFill,
        Phase::MaximumUtilization,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::PriorityFill => "priority-fill",
            Phase::GapFill => "gap-fill",
            Phase::LevelMerge => "level-merge",
            Phase::MultiLevelMerge => "multi-level-merge",
            Phase::ExhaustiveFill => "exhaustive-fill",
            Phase::MaximumUtilization => "maximum-utilization",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coverage after one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCoverage {
    pub phase: Phase,
    /// Scheduled / required, in percent.
    pub coverage: f64,
    /// Classes committed so far.
    pub classes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CoachLevelKey {
    coach: String,
    branch: String,
    level: String,
}

impl CoachLevelKey {
    fn new(coach: &str, branch: &str, level: &str) -> Self {
        Self {
            coach: coach.to_string(),
            branch: branch.to_string(),
            level: level.to_string(),
        }
    }
}

/// Candidate positions in a pool, grouped by (coach, branch, level).
///
/// Positions keep pool order.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    by_coach_level: HashMap<CoachLevelKey, Vec<usize>>,
}

impl CandidateIndex {
    pub fn build(pool: &[Candidate]) -> Self {
        let mut by_coach_level: HashMap<CoachLevelKey, Vec<usize>> = HashMap::new();
        for (i, c) in pool.iter().enumerate() {
            by_coach_level
                .entry(CoachLevelKey::new(&c.coach_id, &c.branch, &c.level))
                .or_default()
                .push(i);
        }
        Self { by_coach_level }
    }

    /// Positions of a coach's candidates for (branch, level).
    pub fn positions(&self, coach: &str, branch: &str, level: &str) -> &[usize] {
        self.by_coach_level
            .get(&CoachLevelKey::new(coach, branch, level))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Splits `size` seats across contributing gaps.
///
/// Proportional to each gap with truncation; the remainder goes one seat at
/// a time to contributors still below their gap, largest gap first.
/// Never gives a contributor more than its gap.
pub fn distribute_seats(size: u32, gaps: &[(String, u32)]) -> Vec<(String, u32)> {
    let total: u32 = gaps.iter().map(|(_, g)| g).sum();
    if total == 0 {
        return gaps.iter().map(|(l, _)| (l.clone(), 0)).collect();
    }
    let size = size.min(total);
    let mut seats: Vec<(String, u32)> = gaps
        .iter()
        .map(|(l, g)| {
            let share = u64::from(size) * u64::from(*g) / u64::from(total);
            (l.clone(), share as u32)
        })
        .collect();

    let mut order: Vec<usize> = (0..gaps.len()).collect();
    order.sort_by(|&a, &b| gaps[b].1.cmp(&gaps[a].1));

    let mut left = size - seats.iter().map(|(_, s)| s).sum::<u32>();
    while left > 0 {
        let mut progressed = false;
        for &i in &order {
            if left == 0 {
                break;
            }
            if seats[i].1 < gaps[i].1 {
                seats[i].1 += 1;
                left -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    seats
}

/// Runs the phases for one iteration.
#[derive(Debug)]
pub struct PhasePipeline<'a> {
    catalog: &'a Catalog,
    config: &'a SchedulerConfig,
    validator: &'a ConstraintValidator<'a>,
    scoring: &'a ScoringFunction<'a>,
    ranking: &'a RankingContext,
    /// Coaches in iteration order, grouped full-time, part-time, manager.
    coaches: Vec<&'a Coach>,
    pool: &'a [Candidate],
    index: CandidateIndex,
}

impl<'a> PhasePipeline<'a> {
    /// Creates a pipeline over an iteration's coach order and candidate pool.
    pub fn new(
        catalog: &'a Catalog,
        config: &'a SchedulerConfig,
        validator: &'a ConstraintValidator<'a>,
        scoring: &'a ScoringFunction<'a>,
        ranking: &'a RankingContext,
        coaches: &[&'a Coach],
        pool: &'a [Candidate],
    ) -> Self {
        let mut coaches = coaches.to_vec();
        coaches.sort_by_key(|c| c.status);
        Self {
            catalog,
            config,
            validator,
            scoring,
            ranking,
            coaches,
            pool,
            index: CandidateIndex::build(pool),
        }
    }

    /// Runs all six phases and reports coverage after each.
    pub fn run(&self, state: &mut SchedulingState) -> Vec<PhaseCoverage> {
        Phase::ALL
            .iter()
            .map(|&phase| {
                self.run_phase(phase, state);
                let report = PhaseCoverage {
                    phase,
                    coverage: state.coverage(),
                    classes: state.entries().len(),
                };
                debug!(
                    phase = %phase,
                    coverage = report.coverage,
                    classes = report.classes,
                    "phase complete"
                );
                report
            })
            .collect()
    }

    /// Runs a single phase.
    pub fn run_phase(&self, phase: Phase, state: &mut SchedulingState) {
        match phase {
            Phase::PriorityFill => self.priority_fill(state),
            Phase::GapFill => self.gap_fill(state),
            Phase::LevelMerge => self.level_merge(state),
            Phase::MultiLevelMerge => self.multi_level_merge(state),
            Phase::ExhaustiveFill => self.exhaustive_fill(state, false),
            Phase::MaximumUtilization => self.exhaustive_fill(state, true),
        }
    }

    fn priority_fill(&self, state: &mut SchedulingState) {
        let mut ranking = self.ranking.clone();
        ranking.remaining = state.ledger().remaining_map().clone();
        let order = RuleEngine::demand_priority(&self.config.priority)
            .sort(state.ledger().keys(), &ranking);

        for key in order {
            if state.ledger().remaining(&key) == 0 {
                continue;
            }
            let qualified = self.qualified(&key);
            let mut seated = 0;
            let mut attempts = 0;

            while state.ledger().remaining(&key) > 0 && attempts < self.config.search.max_attempts {
                attempts += 1;
                let Some(candidate) = self.best_among(state, &qualified, &key.branch, &key.level)
                else {
                    break;
                };
                let size = state.ledger().remaining(&key).min(candidate.capacity);
                if self.commit(state, candidate, &[(key.level.clone(), size)]) {
                    seated += size;
                }
            }

            if seated == 0 {
                warn!(branch = %key.branch, level = %key.level, "constraint limited: no class placed");
            }
        }
    }

    fn gap_fill(&self, state: &mut SchedulingState) {
        let gaps: Vec<RequirementKey> = state.ledger().gaps().into_iter().map(|(k, _)| k).collect();
        if gaps.is_empty() {
            return;
        }
        let mut ranking = self.ranking.clone();
        ranking.remaining = state.ledger().remaining_map().clone();
        let order = RuleEngine::gap_urgency().sort(&gaps, &ranking);

        for key in order {
            for coach in self.qualified(&key) {
                let remaining = state.ledger().remaining(&key);
                if remaining == 0 {
                    break;
                }
                if let Some(candidate) = self.best_among(state, &[coach], &key.branch, &key.level) {
                    let size = remaining.min(candidate.capacity);
                    self.commit(state, candidate, &[(key.level.clone(), size)]);
                }
            }
        }
    }

    fn level_merge(&self, state: &mut SchedulingState) {
        let distance = self.config.merge.level_distance;
        for (key, _) in state.ledger().gaps() {
            let mut compatible: Vec<(usize, u32)> = state
                .entries()
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    e.branch() == key.branch
                        && e.spare_capacity() > 0
                        && self.catalog.levels_compatible(e.level(), &key.level, distance)
                })
                .map(|(i, e)| (i, e.spare_capacity()))
                .collect();
            compatible.sort_by(|a, b| b.1.cmp(&a.1));

            for (index, _) in compatible {
                let remaining = state.ledger().remaining(&key);
                if remaining == 0 {
                    break;
                }
                let seated = state.top_up(index, &key.level, remaining);
                if seated > 0 {
                    debug!(branch = %key.branch, level = %key.level, seated, "merged into existing class");
                }
            }
        }
    }

    fn multi_level_merge(&self, state: &mut SchedulingState) {
        let gaps = state.ledger().gaps();
        if gaps.is_empty() {
            return;
        }

        let mut branches: Vec<&str> = Vec::new();
        for (key, _) in &gaps {
            if !branches.contains(&key.branch.as_str()) {
                branches.push(&key.branch);
            }
        }

        for branch in branches {
            let mut level_gaps: Vec<(&str, u32)> = gaps
                .iter()
                .filter(|(k, _)| k.branch == branch)
                .map(|(k, g)| (k.level.as_str(), *g))
                .collect();
            level_gaps.sort_by(|a, b| b.1.cmp(&a.1));

            let mut combinations: Vec<([&str; 2], u32)> = Vec::new();
            for i in 0..level_gaps.len() {
                for j in i + 1..level_gaps.len() {
                    let (a, ga) = level_gaps[i];
                    let (b, gb) = level_gaps[j];
                    if self.catalog.levels_compatible(a, b, self.config.merge.level_distance) {
                        combinations.push(([a, b], ga + gb));
                    }
                }
            }
            combinations.sort_by(|a, b| b.1.cmp(&a.1));

            for (levels, _) in combinations {
                self.merge_combination(state, branch, levels);
            }
        }
    }

    fn merge_combination(&self, state: &mut SchedulingState, branch: &str, levels: [&str; 2]) {
        let live: Vec<(String, u32)> = levels
            .iter()
            .map(|l| {
                let gap = state.ledger().remaining(&RequirementKey::new(branch, *l));
                (l.to_string(), gap)
            })
            .collect();
        let total: u32 = live.iter().map(|(_, g)| g).sum();
        if live.iter().any(|(_, g)| *g == 0) || total < self.config.merge.min_merge_size {
            return;
        }

        let capacity = levels
            .iter()
            .map(|l| self.catalog.capacity(l))
            .max()
            .unwrap_or(0);
        let coaches: Vec<&Coach> = self
            .coaches
            .iter()
            .copied()
            .filter(|c| c.works_at(branch) && levels.iter().all(|l| c.is_qualified(l)))
            .collect();

        for coach in coaches {
            let Some(candidate) = self.best_among(state, &[coach], branch, levels[0]) else {
                continue;
            };
            let size = total.min(capacity);
            let seats = distribute_seats(size, &live);
            let merged = candidate.clone().with_capacity(capacity);
            if self.commit(state, &merged, &seats) {
                debug!(
                    branch,
                    levels = %levels.join("+"),
                    students = size,
                    "multi-level class created"
                );
                return;
            }
        }
    }

    fn exhaustive_fill(&self, state: &mut SchedulingState, until_full: bool) {
        if state.ledger().is_satisfied() {
            return;
        }
        let days = self.catalog.operating_days();
        let limits = &self.config.workload;

        for coach in &self.coaches {
            for &day in &days {
                let cap = limits.daily_classes(self.catalog.day_type(day));
                while state.classes_on(&coach.id, day) < cap {
                    if !self.fill_one(state, coach, day) || !until_full {
                        break;
                    }
                }
            }
        }
    }

    /// Commits the first valid class for a coach on a day, for the first
    /// remaining demand the coach can serve.
    fn fill_one(&self, state: &mut SchedulingState, coach: &Coach, day: Day) -> bool {
        for (key, remaining) in state.ledger().gaps() {
            if !coach.can_teach(&key.branch, &key.level) {
                continue;
            }
            let found = self
                .index
                .positions(&coach.id, &key.branch, &key.level)
                .iter()
                .map(|&i| &self.pool[i])
                .filter(|c| c.day == day)
                .find(|c| self.validator.validate(c, state));
            if let Some(candidate) = found {
                let size = remaining.min(candidate.capacity);
                if self.commit(state, candidate, &[(key.level.clone(), size)]) {
                    return true;
                }
            }
        }
        false
    }

    /// One class per requirement, sized to its full demand.
    ///
    /// Used when no iteration produced a usable result.
    pub fn single_pass(&self, state: &mut SchedulingState) {
        for key in state.ledger().keys().to_vec() {
            let qualified = self.qualified(&key);
            if qualified.is_empty() {
                continue;
            }
            if let Some(candidate) = self.best_among(state, &qualified, &key.branch, &key.level) {
                let size = state.ledger().remaining(&key).min(candidate.capacity);
                self.commit(state, candidate, &[(key.level.clone(), size)]);
            }
        }
    }

    /// Qualified coaches for a requirement, in pipeline order.
    fn qualified(&self, key: &RequirementKey) -> Vec<&'a Coach> {
        self.coaches
            .iter()
            .copied()
            .filter(|c| c.can_teach(&key.branch, &key.level))
            .collect()
    }

    /// Highest scoring valid candidate over the given coaches.
    ///
    /// Ties go to the first found. Coaches at their weekly cap are skipped.
    fn best_among(
        &self,
        state: &SchedulingState,
        coaches: &[&Coach],
        branch: &str,
        level: &str,
    ) -> Option<&'a Candidate> {
        let mut best: Option<(&'a Candidate, f64)> = None;
        for coach in coaches {
            if state.weekly_classes(&coach.id) >= self.config.workload.weekly_cap(coach.status) {
                continue;
            }
            for &i in self.index.positions(&coach.id, branch, level) {
                let candidate = &self.pool[i];
                if let Err(rejection) = self.validator.check(candidate, state) {
                    trace!(candidate = candidate.id, coach = %coach.id, %rejection, "rejected");
                    continue;
                }
                let score = self.scoring.score(candidate, state);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((candidate, score));
                }
            }
        }
        best.map(|(c, _)| c)
    }

    /// Validates and records a class. The only path that adds classes.
    fn commit(&self, state: &mut SchedulingState, candidate: &Candidate, seats: &[(String, u32)]) -> bool {
        match self.validator.check(candidate, state) {
            Ok(()) => {
                state.record(candidate, seats);
                trace!(
                    candidate = candidate.id,
                    coach = %candidate.coach_id,
                    branch = %candidate.branch,
                    level = %candidate.level,
                    day = %candidate.day,
                    start = %candidate.start,
                    "class committed"
                );
                true
            }
            Err(rejection) => {
                trace!(candidate = candidate.id, %rejection, "commit rejected");
                false
            }
        }
    }
}
