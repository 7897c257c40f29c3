//! Problem input.
//!
//! A [`SchedulingProblem`] is the pre-loaded in-memory snapshot handed to
//! the engine: catalog, coaches, demand and the candidate pool. When the
//! candidate pool is empty and `generation` is set, callers can build the
//! pool with [`crate::generation::CandidateGenerator`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Candidate, Catalog, Coach, Requirement, RequirementKey};
use crate::generation::GenerationSettings;

/// Everything one scheduling run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingProblem {
    /// Static business data.
    #[serde(default)]
    pub catalog: Catalog,
    /// Coaches, in input order.
    pub coaches: Vec<Coach>,
    /// Demand per (branch, level), in input order.
    pub requirements: Vec<Requirement>,
    /// Candidate pool.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Operating hours used to generate candidates when none are supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSettings>,
}

impl SchedulingProblem {
    /// Creates an empty problem with the given catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    /// Adds a coach.
    pub fn with_coach(mut self, coach: Coach) -> Self {
        self.coaches.push(coach);
        self
    }

    /// Adds a requirement.
    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Adds a candidate.
    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Replaces the candidate pool.
    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Sets the generation settings.
    pub fn with_generation(mut self, settings: GenerationSettings) -> Self {
        self.generation = Some(settings);
        self
    }

    /// Finds a coach by id.
    pub fn coach(&self, id: &str) -> Option<&Coach> {
        self.coaches.iter().find(|c| c.id == id)
    }

    /// Coaches indexed by id.
    pub fn coach_index(&self) -> HashMap<&str, &Coach> {
        self.coaches.iter().map(|c| (c.id.as_str(), c)).collect()
    }

    /// Demand for a (branch, level), zero when absent.
    pub fn demand(&self, key: &RequirementKey) -> u32 {
        self.requirements
            .iter()
            .filter(|r| r.matches(&key.branch, &key.level))
            .map(|r| r.students)
            .sum()
    }

    /// Total enrolled students.
    pub fn total_required(&self) -> u32 {
        self.requirements.iter().map(|r| r.students).sum()
    }

    /// Coaches who may teach `level` at `branch`.
    pub fn qualified_coaches<'a>(
        &'a self,
        branch: &'a str,
        level: &'a str,
    ) -> impl Iterator<Item = &'a Coach> + 'a {
        self.coaches
            .iter()
            .filter(move |c| c.can_teach(branch, level))
    }

    /// Candidates flagged as popular.
    pub fn popular_candidates(&self) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.is_popular)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Day;

    fn sample() -> SchedulingProblem {
        let c1 = Candidate::new(
            1,
            "C1",
            "BB",
            "L1",
            Day::Tue,
            "15:00".parse().unwrap(),
            "16:30".parse().unwrap(),
        )
        .with_popular(true);
        let c2 = Candidate::new(
            2,
            "C1",
            "BB",
            "L1",
            Day::Tue,
            "17:00".parse().unwrap(),
            "18:30".parse().unwrap(),
        );
        SchedulingProblem::new(Catalog::default())
            .with_coach(
                Coach::full_time("C1")
                    .with_qualification("L1")
                    .with_branch("BB"),
            )
            .with_coach(Coach::part_time("C2").with_qualification("L1"))
            .with_requirement(Requirement::new("BB", "L1", 12))
            .with_requirement(Requirement::new("BB", "L2", 4))
            .with_candidate(c1)
            .with_candidate(c2)
    }

    #[test]
    fn test_problem_queries() {
        let p = sample();
        assert_eq!(p.total_required(), 16);
        assert_eq!(p.demand(&RequirementKey::new("BB", "L1")), 12);
        assert_eq!(p.demand(&RequirementKey::new("KT", "L1")), 0);
        assert!(p.coach("C2").is_some());
        assert_eq!(p.qualified_coaches("BB", "L1").count(), 1);
        assert_eq!(p.popular_candidates().len(), 1);
        assert_eq!(p.coach_index().len(), 2);
    }

    #[test]
    fn test_problem_deserialize_minimal() {
        let json = r#"{
            "coaches": [{"id": "C1", "status": "FullTime"}],
            "requirements": [{"branch": "BB", "level": "L1", "students": 8}]
        }"#;
        let p: SchedulingProblem = serde_json::from_str(json).unwrap();
        assert!(p.candidates.is_empty());
        assert!(p.generation.is_none());
        assert_eq!(p.catalog.capacity("L2"), 9);
    }
}
