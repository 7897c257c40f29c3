//! Built-in priority rules.
//!
//! # Categories
//!
//! - **Resource**: SCARCITY
//! - **Level**: COMPLEXITY
//! - **Demand**: SIZE, GAP
//!
//! # Score Convention
//! All rules return lower scores for higher priority requirements.

use super::{PriorityRule, RankingContext, RuleScore};
use crate::models::RequirementKey;

/// Upper bound of the scarcity score.
pub const MAX_SCARCITY: f64 = 10.0;

/// Coach and slot scarcity.
///
/// `min(10, 50 / max(1, coaches) + 30 / max(1, candidates))`. Requirements
/// served by few coaches or few slots rank first.
#[derive(Debug, Clone, Copy)]
pub struct Scarcity;

impl Scarcity {
    /// Raw scarcity value (higher = scarcer).
    pub fn value(key: &RequirementKey, context: &RankingContext) -> f64 {
        let coaches = context.coaches_for(key).max(1) as f64;
        let slots = context.candidates_for(key).max(1) as f64;
        (50.0 / coaches + 30.0 / slots).min(MAX_SCARCITY)
    }
}

impl PriorityRule for Scarcity {
    fn name(&self) -> &'static str {
        "SCARCITY"
    }

    fn evaluate(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore {
        -Self::value(key, context)
    }

    fn description(&self) -> &'static str {
        "Fewest qualified coaches and candidate slots"
    }
}

/// Level complexity.
///
/// Higher levels in the hierarchy rank first. Levels listed in
/// `boosted_levels` get `boost` added on top.
#[derive(Debug, Clone, Default)]
pub struct Complexity {
    pub boosted_levels: Vec<String>,
    pub boost: f64,
}

impl Complexity {
    /// Creates the rule with boosted levels.
    pub fn with_boost(boosted_levels: Vec<String>, boost: f64) -> Self {
        Self {
            boosted_levels,
            boost,
        }
    }

    /// Raw complexity value including any boost.
    pub fn value(&self, key: &RequirementKey, context: &RankingContext) -> f64 {
        let base = context.complexity_of(&key.level);
        if self.boosted_levels.iter().any(|l| *l == key.level) {
            base + self.boost
        } else {
            base
        }
    }
}

impl PriorityRule for Complexity {
    fn name(&self) -> &'static str {
        "COMPLEXITY"
    }

    fn evaluate(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore {
        -self.value(key, context)
    }

    fn description(&self) -> &'static str {
        "Most advanced level"
    }
}

/// Enrollment size.
///
/// `min(demand / 20, 1)`: larger groups rank first, saturating at 20.
#[derive(Debug, Clone, Copy)]
pub struct EnrollmentSize;

impl EnrollmentSize {
    pub fn value(key: &RequirementKey, context: &RankingContext) -> f64 {
        (f64::from(context.demand_for(key)) / 20.0).min(1.0)
    }
}

impl PriorityRule for EnrollmentSize {
    fn name(&self) -> &'static str {
        "SIZE"
    }

    fn evaluate(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore {
        -Self::value(key, context)
    }

    fn description(&self) -> &'static str {
        "Largest enrollment"
    }
}

/// Largest remaining gap first.
#[derive(Debug, Clone, Copy)]
pub struct LargestGap;

impl PriorityRule for LargestGap {
    fn name(&self) -> &'static str {
        "GAP"
    }

    fn evaluate(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore {
        -f64::from(context.remaining_for(key))
    }

    fn description(&self) -> &'static str {
        "Most students still unseated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(level: &str) -> RequirementKey {
        RequirementKey::new("BB", level)
    }

    #[test]
    fn test_scarcity_formula() {
        let ctx = RankingContext::new()
            .with_qualified_coaches(key("L1"), 10)
            .with_candidate_count(key("L1"), 30);
        // 50/10 + 30/30 = 6
        assert!((Scarcity::value(&key("L1"), &ctx) - 6.0).abs() < 1e-10);
        assert!((Scarcity.evaluate(&key("L1"), &ctx) + 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_scarcity_capped() {
        let ctx = RankingContext::new();
        // No coaches, no slots: 50 + 30 capped at 10
        assert!((Scarcity::value(&key("L1"), &ctx) - MAX_SCARCITY).abs() < 1e-10);
    }

    #[test]
    fn test_complexity_boost() {
        let ctx = RankingContext::new()
            .with_complexity("L4", 0.8)
            .with_complexity("Advance", 0.9);
        let rule = Complexity::with_boost(vec!["Advance".into()], 2.0);
        assert!((rule.value(&key("L4"), &ctx) - 0.8).abs() < 1e-10);
        assert!((rule.value(&key("Advance"), &ctx) - 2.9).abs() < 1e-10);
        assert!(rule.evaluate(&key("Advance"), &ctx) < rule.evaluate(&key("L4"), &ctx));
    }

    #[test]
    fn test_size_saturates() {
        let ctx = RankingContext::new()
            .with_demand(key("L1"), 10)
            .with_demand(key("L2"), 45);
        assert!((EnrollmentSize::value(&key("L1"), &ctx) - 0.5).abs() < 1e-10);
        assert!((EnrollmentSize::value(&key("L2"), &ctx) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_largest_gap() {
        let ctx = RankingContext::new()
            .with_demand(key("L1"), 10)
            .with_remaining(key("L1"), 3)
            .with_demand(key("L2"), 10);
        assert!(LargestGap.evaluate(&key("L2"), &ctx) < LargestGap.evaluate(&key("L1"), &ctx));
    }
}
