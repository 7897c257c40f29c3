//! Priority rules and rule engine for ordering unmet demand.
//!
//! Each (branch, level) requirement is scored by one or more
//! [`PriorityRule`]s (coach scarcity, level complexity, enrollment size,
//! remaining gap) and a [`RuleEngine`] combines them into an order.
//!
//! # Usage
//!
//! ```
//! use u_timetable::config::PriorityWeights;
//! use u_timetable::dispatching::{RankingContext, RuleEngine};
//! use u_timetable::models::RequirementKey;
//!
//! let keys = vec![RequirementKey::new("BB", "L1"), RequirementKey::new("BB", "Advance")];
//! let context = RankingContext::new()
//!     .with_demand(keys[0].clone(), 12)
//!     .with_demand(keys[1].clone(), 4)
//!     .with_complexity("Advance", 0.9);
//!
//! let engine = RuleEngine::demand_priority(&PriorityWeights::default());
//! let order = engine.sort(&keys, &context);
//! assert_eq!(order[0].level, "Advance");
//! ```

mod context;
mod engine;
pub mod rules;

pub use context::RankingContext;
pub use engine::{EvaluationMode, RuleEngine};

use crate::models::RequirementKey;
use std::fmt::Debug;

/// Score returned by a priority rule.
///
/// Lower scores = higher priority (ranked first).
pub type RuleScore = f64;

/// A rule that evaluates how urgently a requirement should be served.
///
/// # Score Convention
/// **Lower score = higher priority.** Rules measuring urgency return the
/// negated value.
pub trait PriorityRule: Send + Sync + Debug {
    /// Rule name (e.g., "SCARCITY").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a requirement given the ranking context.
    ///
    /// Returns a score where lower = higher priority.
    fn evaluate(&self, key: &RequirementKey, context: &RankingContext) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
