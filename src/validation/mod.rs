//! Input validation and schedule auditing.
//!
//! [`validate_input`] checks structural integrity of a problem before a
//! run. Detects:
//! - Duplicate coach, candidate and requirement ids
//! - Candidates referencing unknown coaches
//! - Candidates with an empty or inconsistent time interval
//! - Candidates whose period disagrees with their start time
//! - Candidates with zero capacity
//!
//! The [`audit`] submodule re-checks a finished schedule.

pub mod audit;

pub use audit::{AuditReport, AuditStatus, ComprehensiveValidator, RequirementCoverage};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::SchedulingProblem;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A candidate references a coach that doesn't exist.
    UnknownCoach,
    /// A candidate's end is not after its start, or its duration disagrees.
    InvalidInterval,
    /// A candidate's period disagrees with its start time.
    InvalidPeriod,
    /// A candidate can hold no students.
    ZeroCapacity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input data for a scheduling problem.
///
/// Checks:
/// 1. No duplicate coach IDs
/// 2. No duplicate (branch, level) requirements
/// 3. No duplicate candidate IDs
/// 4. Every candidate references an existing coach
/// 5. Every candidate ends after it starts and its duration matches
/// 6. Every candidate's period matches its start time
/// 7. Every candidate has a positive capacity
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(problem: &SchedulingProblem) -> ValidationResult {
    let mut errors = Vec::new();

    let mut coach_ids = HashSet::new();
    for coach in &problem.coaches {
        if !coach_ids.insert(coach.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate coach ID: {}", coach.id),
            ));
        }
    }

    let mut requirement_keys = HashSet::new();
    for req in &problem.requirements {
        if !requirement_keys.insert(req.key()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate requirement: {}", req.key()),
            ));
        }
    }

    let mut candidate_ids = HashSet::new();
    for cand in &problem.candidates {
        if !candidate_ids.insert(cand.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate candidate ID: {}", cand.id),
            ));
        }

        if !coach_ids.contains(cand.coach_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownCoach,
                format!(
                    "Candidate {} references unknown coach '{}'",
                    cand.id, cand.coach_id
                ),
            ));
        }

        if cand.end <= cand.start {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!(
                    "Candidate {} ends at {} before it starts at {}",
                    cand.id, cand.end, cand.start
                ),
            ));
        } else if cand.interval().duration_minutes() != cand.duration_minutes {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!(
                    "Candidate {} lasts {} minutes but declares {}",
                    cand.id,
                    cand.interval().duration_minutes(),
                    cand.duration_minutes
                ),
            ));
        }

        if cand.period != cand.start.period() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidPeriod,
                format!(
                    "Candidate {} starts at {} but is marked {:?}",
                    cand.id, cand.start, cand.period
                ),
            ));
        }

        if cand.capacity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroCapacity,
                format!("Candidate {} has zero capacity", cand.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Catalog, Coach, Day, Period, Requirement};

    fn cand(id: u32, coach: &str, start: &str, end: &str) -> Candidate {
        Candidate::new(
            id,
            coach,
            "BB",
            "L1",
            Day::Tue,
            start.parse().unwrap(),
            end.parse().unwrap(),
        )
    }

    fn sample_problem() -> SchedulingProblem {
        SchedulingProblem::new(Catalog::default())
            .with_coach(Coach::full_time("C1").with_qualification("L1").with_branch("BB"))
            .with_coach(Coach::part_time("C2").with_qualification("L1").with_branch("BB"))
            .with_requirement(Requirement::new("BB", "L1", 10))
            .with_candidate(cand(1, "C1", "15:00", "16:30"))
            .with_candidate(cand(2, "C2", "15:00", "16:30"))
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_problem()).is_ok());
    }

    #[test]
    fn test_duplicate_coach_id() {
        let problem = sample_problem().with_coach(Coach::branch_manager("C1"));
        let errors = validate_input(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("coach")));
    }

    #[test]
    fn test_duplicate_requirement() {
        let problem = sample_problem().with_requirement(Requirement::new("BB", "L1", 3));
        let errors = validate_input(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("BB L1")));
    }

    #[test]
    fn test_duplicate_candidate_id() {
        let problem = sample_problem().with_candidate(cand(1, "C2", "17:00", "18:30"));
        let errors = validate_input(&problem).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateId);
    }

    #[test]
    fn test_unknown_coach() {
        let problem = sample_problem().with_candidate(cand(3, "ghost", "17:00", "18:30"));
        let errors = validate_input(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownCoach && e.message.contains("ghost")));
    }

    #[test]
    fn test_invalid_intervals() {
        let inverted = cand(3, "C1", "17:00", "16:00");
        let mut mismatched = cand(4, "C1", "17:00", "18:00");
        mismatched.duration_minutes = 90;
        let problem = sample_problem()
            .with_candidate(inverted)
            .with_candidate(mismatched);
        let errors = validate_input(&problem).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidInterval)
                .count(),
            2
        );
    }

    #[test]
    fn test_period_must_match_start() {
        let mut afternoon_marked_morning = cand(3, "C1", "15:00", "16:30");
        afternoon_marked_morning.period = Period::Morning;
        let problem = sample_problem().with_candidate(afternoon_marked_morning);
        let errors = validate_input(&problem).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidPeriod);
        assert!(errors[0].message.contains("15:00"));

        let mut noon = cand(4, "C1", "12:00", "13:30");
        noon.period = Period::Afternoon;
        assert!(validate_input(&sample_problem().with_candidate(noon)).is_ok());
    }

    #[test]
    fn test_zero_capacity() {
        let problem = sample_problem().with_candidate(cand(3, "C1", "17:00", "18:30").with_capacity(0));
        let errors = validate_input(&problem).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::ZeroCapacity));
    }

    #[test]
    fn test_multiple_errors() {
        let problem = sample_problem()
            .with_coach(Coach::full_time("C2"))
            .with_candidate(cand(2, "nobody", "10:00", "09:00"));
        let errors = validate_input(&problem).unwrap_err();
        assert!(errors.len() >= 4);
    }
}
