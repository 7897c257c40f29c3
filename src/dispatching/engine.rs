//! Rule engine for multi-criteria demand ranking.
//!
//! Composes multiple priority rules with configurable evaluation modes.
//! Scores are quantized to a fixed grid before comparison so that near
//! equal scores tie; ties keep input order.

use std::cmp::Ordering;
use std::sync::Arc;

use super::rules::{Complexity, EnrollmentSize, LargestGap, Scarcity};
use super::{PriorityRule, RankingContext, RuleScore};
use crate::config::PriorityWeights;
use crate::models::RequirementKey;

/// Width of the grid scores are rounded to before comparing.
const SCORE_GRID: f64 = 1e-9;

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn PriorityRule>,
    weight: f64,
}

/// A composable rule engine for requirement prioritization.
///
/// # Example
/// ```
/// use u_timetable::dispatching::{RankingContext, RuleEngine};
/// use u_timetable::dispatching::rules;
/// use u_timetable::models::RequirementKey;
///
/// let keys = vec![RequirementKey::new("BB", "L1"), RequirementKey::new("KT", "L1")];
/// let context = RankingContext::new()
///     .with_remaining(keys[0].clone(), 3)
///     .with_remaining(keys[1].clone(), 9);
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::LargestGap)
///     .with_tie_breaker(rules::Scarcity);
/// assert_eq!(engine.sort(&keys, &context)[0].branch, "KT");
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
        }
    }

    /// Composite demand priority: weighted scarcity, complexity and size.
    pub fn demand_priority(weights: &PriorityWeights) -> Self {
        Self::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(Scarcity, weights.scarcity)
            .with_weighted_rule(
                Complexity::with_boost(weights.boosted_levels.clone(), weights.advance_level_boost),
                weights.complexity,
            )
            .with_weighted_rule(EnrollmentSize, weights.size)
    }

    /// Gap urgency: largest remaining gap, then scarcity.
    pub fn gap_urgency() -> Self {
        Self::new()
            .with_rule(LargestGap)
            .with_tie_breaker(Scarcity)
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: PriorityRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: PriorityRule + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, used only in Sequential mode).
    pub fn with_tie_breaker<R: PriorityRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 0.0,
        });
        self
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sorts requirements by priority (highest priority first).
    ///
    /// Returns indices into `keys`.
    pub fn sort_indices(&self, keys: &[RequirementKey], context: &RankingContext) -> Vec<usize> {
        let scores: Vec<Vec<f64>> = keys
            .iter()
            .map(|k| match self.mode {
                EvaluationMode::Sequential => self
                    .rules
                    .iter()
                    .map(|wr| quantize(wr.rule.evaluate(k, context)))
                    .collect(),
                EvaluationMode::Weighted => vec![quantize(self.weighted_score(k, context))],
            })
            .collect();

        let mut indices: Vec<usize> = (0..keys.len()).collect();
        indices.sort_by(|&a, &b| compare_scores(&scores[a], &scores[b]));
        indices
    }

    /// Sorts requirements by priority, returning owned keys.
    pub fn sort(&self, keys: &[RequirementKey], context: &RankingContext) -> Vec<RequirementKey> {
        self.sort_indices(keys, context)
            .into_iter()
            .map(|i| keys[i].clone())
            .collect()
    }

    /// Composite priority (higher = more urgent), for reporting.
    pub fn priority(&self, key: &RequirementKey, context: &RankingContext) -> f64 {
        -self.weighted_score(key, context)
    }

    fn weighted_score(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(key, context) * wr.weight)
            .sum()
    }
}

fn quantize(score: f64) -> f64 {
    (score / SCORE_GRID).round()
}

/// Lexicographic total order over quantized score vectors.
fn compare_scores(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::rules;

    fn key(branch: &str, level: &str) -> RequirementKey {
        RequirementKey::new(branch, level)
    }

    #[test]
    fn test_scarcity_ordering() {
        let keys = vec![key("BB", "L1"), key("BB", "L2"), key("BB", "L3")];
        let ctx = RankingContext::new()
            .with_qualified_coaches(keys[0].clone(), 10)
            .with_candidate_count(keys[0].clone(), 100)
            .with_qualified_coaches(keys[1].clone(), 1)
            .with_candidate_count(keys[1].clone(), 100)
            .with_qualified_coaches(keys[2].clone(), 25)
            .with_candidate_count(keys[2].clone(), 100);
        let engine = RuleEngine::new().with_rule(rules::Scarcity);

        let order = engine.sort(&keys, &ctx);
        assert_eq!(order[0].level, "L2");
        assert_eq!(order[1].level, "L1");
        assert_eq!(order[2].level, "L3");
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let keys = vec![key("BB", "L1"), key("KT", "L1")];
        let ctx = RankingContext::new()
            .with_demand(keys[0].clone(), 6)
            .with_demand(keys[1].clone(), 6)
            .with_qualified_coaches(keys[0].clone(), 20)
            .with_candidate_count(keys[0].clone(), 100)
            .with_qualified_coaches(keys[1].clone(), 6)
            .with_candidate_count(keys[1].clone(), 100);

        let order = RuleEngine::gap_urgency().sort(&keys, &ctx);
        // Same gap; KT has fewer coaches
        assert_eq!(order[0].branch, "KT");
    }

    #[test]
    fn test_weighted_demand_priority() {
        let keys = vec![key("BB", "L1"), key("BB", "Advance")];
        let ctx = RankingContext::new()
            .with_demand(keys[0].clone(), 20)
            .with_demand(keys[1].clone(), 5)
            .with_qualified_coaches(keys[0].clone(), 10)
            .with_candidate_count(keys[0].clone(), 30)
            .with_qualified_coaches(keys[1].clone(), 10)
            .with_candidate_count(keys[1].clone(), 30)
            .with_complexity("L1", 0.45)
            .with_complexity("Advance", 0.8);
        let engine = RuleEngine::demand_priority(&PriorityWeights::default());

        // L1:      0.5*6 + 0.3*0.45 + 0.2*1.0  = 3.335
        // Advance: 0.5*6 + 0.3*2.8  + 0.2*0.25 = 3.89
        assert!((engine.priority(&keys[0], &ctx) - 3.335).abs() < 1e-10);
        assert!((engine.priority(&keys[1], &ctx) - 3.89).abs() < 1e-10);
        assert_eq!(engine.sort_indices(&keys, &ctx)[0], 1);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let keys = vec![key("KT", "L1"), key("BB", "L1"), key("CH", "L1")];
        let ctx = RankingContext::new();
        let engine = RuleEngine::demand_priority(&PriorityWeights::default());
        assert_eq!(engine.sort_indices(&keys, &ctx), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_keys() {
        let ctx = RankingContext::new();
        let engine = RuleEngine::new().with_rule(rules::Scarcity);
        assert!(engine.sort_indices(&[], &ctx).is_empty());
    }

    #[test]
    fn test_near_equal_scores_tie() {
        // Complexities a hair apart collapse onto the same grid point and
        // keep input order; a visible difference still ranks.
        let keys = vec![key("BB", "L1"), key("BB", "L2"), key("BB", "L3")];
        let ctx = RankingContext::new()
            .with_complexity("L1", 0.5)
            .with_complexity("L2", 0.5 + 1e-13)
            .with_complexity("L3", 0.6);
        let engine = RuleEngine::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(rules::Complexity::default(), 1.0);
        assert_eq!(engine.sort_indices(&keys, &ctx), vec![2, 0, 1]);
    }

    #[test]
    fn test_sort_is_total_over_many_close_scores() {
        let keys: Vec<RequirementKey> = (0..64).map(|i| key("BB", &format!("X{i}"))).collect();
        let mut ctx = RankingContext::new();
        for (i, k) in keys.iter().enumerate() {
            ctx = ctx.with_complexity(k.level.clone(), 0.5 + (i % 7) as f64 * 4e-10);
        }
        let engine = RuleEngine::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(rules::Complexity::default(), 1.0);
        let order = engine.sort_indices(&keys, &ctx);
        let mut seen = order.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
    }
}
