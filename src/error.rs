//! Error types.
//!
//! Only structural problems are errors. A demand that cannot be met or a
//! candidate that fails a constraint is an ordinary search outcome and is
//! reported through the result, never through `Err`.

use thiserror::Error;

use crate::validation::ValidationError;

/// Invalid configuration detected at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors returned when setting up a scheduling run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid input: {} issue(s), first: {}", .0.len(), first_message(.0))]
    InvalidInput(Vec<ValidationError>),
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("none")
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
