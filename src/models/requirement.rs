//! Enrollment demand.
//!
//! A requirement is the number of enrolled students for one
//! (branch, level) pair. The scheduler tries to seat every one of them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a demand entry: one level taught at one branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequirementKey {
    pub branch: String,
    pub level: String,
}

impl RequirementKey {
    /// Creates a new key.
    pub fn new(branch: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            level: level.into(),
        }
    }
}

impl fmt::Display for RequirementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.branch, self.level)
    }
}

/// Enrolled students for one (branch, level).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub branch: String,
    pub level: String,
    /// Enrolled student count.
    pub students: u32,
}

impl Requirement {
    /// Creates a new requirement.
    pub fn new(branch: impl Into<String>, level: impl Into<String>, students: u32) -> Self {
        Self {
            branch: branch.into(),
            level: level.into(),
            students,
        }
    }

    /// The (branch, level) key.
    pub fn key(&self) -> RequirementKey {
        RequirementKey::new(&self.branch, &self.level)
    }

    /// Whether this requirement matches a (branch, level).
    pub fn matches(&self, branch: &str, level: &str) -> bool {
        self.branch == branch && self.level == level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_key() {
        let r = Requirement::new("BB", "L1", 12);
        assert_eq!(r.key(), RequirementKey::new("BB", "L1"));
        assert!(r.matches("BB", "L1"));
        assert!(!r.matches("BB", "L2"));
        assert_eq!(r.key().to_string(), "BB L1");
    }

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            RequirementKey::new("KT", "L1"),
            RequirementKey::new("BB", "L2"),
            RequirementKey::new("BB", "L1"),
        ];
        keys.sort();
        assert_eq!(keys[0], RequirementKey::new("BB", "L1"));
        assert_eq!(keys[2], RequirementKey::new("KT", "L1"));
    }
}
