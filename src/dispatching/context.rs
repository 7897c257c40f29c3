//! Ranking context for priority rule evaluation.

use std::collections::HashMap;

use crate::models::{RequirementKey, SchedulingProblem, UNKNOWN_LEVEL_COMPLEXITY};

/// Data passed to priority rules.
///
/// Counts are taken from the whole problem (full candidate pool) so the
/// ranking does not depend on which pool an iteration uses. Only
/// `remaining` changes during a run.
#[derive(Debug, Clone, Default)]
pub struct RankingContext {
    /// Coaches qualified for and assigned to each (branch, level).
    pub qualified_coaches: HashMap<RequirementKey, usize>,
    /// Candidates in the full pool for each (branch, level).
    pub candidate_counts: HashMap<RequirementKey, usize>,
    /// Enrolled students per (branch, level).
    pub demand: HashMap<RequirementKey, u32>,
    /// Students not yet seated per (branch, level).
    pub remaining: HashMap<RequirementKey, u32>,
    /// Normalised hierarchy position per level.
    pub level_complexity: HashMap<String, f64>,
}

impl RankingContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives all counts from a problem. `remaining` starts equal to demand.
    pub fn from_problem(problem: &SchedulingProblem) -> Self {
        let mut ctx = Self::new();
        for req in &problem.requirements {
            let key = req.key();
            let coaches = problem.qualified_coaches(&req.branch, &req.level).count();
            ctx.qualified_coaches.insert(key.clone(), coaches);
            ctx.candidate_counts.insert(key.clone(), 0);
            *ctx.demand.entry(key.clone()).or_insert(0) += req.students;
            *ctx.remaining.entry(key).or_insert(0) += req.students;
            ctx.level_complexity
                .insert(req.level.clone(), problem.catalog.complexity(&req.level));
        }
        for cand in &problem.candidates {
            if let Some(n) = ctx.candidate_counts.get_mut(&cand.requirement_key()) {
                *n += 1;
            }
        }
        ctx
    }

    /// Sets the qualified coach count for a requirement.
    pub fn with_qualified_coaches(mut self, key: RequirementKey, count: usize) -> Self {
        self.qualified_coaches.insert(key, count);
        self
    }

    /// Sets the candidate count for a requirement.
    pub fn with_candidate_count(mut self, key: RequirementKey, count: usize) -> Self {
        self.candidate_counts.insert(key, count);
        self
    }

    /// Sets demand (and remaining) for a requirement.
    pub fn with_demand(mut self, key: RequirementKey, students: u32) -> Self {
        self.demand.insert(key.clone(), students);
        self.remaining.insert(key, students);
        self
    }

    /// Sets the remaining gap for a requirement.
    pub fn with_remaining(mut self, key: RequirementKey, students: u32) -> Self {
        self.remaining.insert(key, students);
        self
    }

    /// Sets a level's complexity.
    pub fn with_complexity(mut self, level: impl Into<String>, complexity: f64) -> Self {
        self.level_complexity.insert(level.into(), complexity);
        self
    }

    /// Qualified coach count (0 when unknown).
    pub fn coaches_for(&self, key: &RequirementKey) -> usize {
        self.qualified_coaches.get(key).copied().unwrap_or(0)
    }

    /// Candidate count (0 when unknown).
    pub fn candidates_for(&self, key: &RequirementKey) -> usize {
        self.candidate_counts.get(key).copied().unwrap_or(0)
    }

    /// Enrolled students (0 when unknown).
    pub fn demand_for(&self, key: &RequirementKey) -> u32 {
        self.demand.get(key).copied().unwrap_or(0)
    }

    /// Remaining gap (0 when unknown).
    pub fn remaining_for(&self, key: &RequirementKey) -> u32 {
        self.remaining.get(key).copied().unwrap_or(0)
    }

    /// Level complexity, falling back to the unknown-level value.
    pub fn complexity_of(&self, level: &str) -> f64 {
        self.level_complexity
            .get(level)
            .copied()
            .unwrap_or(UNKNOWN_LEVEL_COMPLEXITY)
    }
}
