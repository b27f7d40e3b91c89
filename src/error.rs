//! Error taxonomy shared by the controller and the API client

use chrono::NaiveDate;
use thiserror::Error;

/// Rejections decided locally, before any request leaves the client
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("select at least one muscle group")]
    NoMuscleGroups,
    #[error("select at least one exercise")]
    NoExercisesSelected,
    #[error("series count must be between 1 and 10, got {0}")]
    SeriesCountOutOfRange(u8),
    #[error("this exercise already has {0} planned series")]
    SeriesAlreadyPlanned(u8),
    #[error("weight must be greater than zero")]
    NonPositiveWeight,
    #[error("reps must be greater than zero")]
    NonPositiveReps,
    #[error("difficulty must be between 1 and 5, got {0}")]
    DifficultyOutOfRange(u8),
    #[error("series {got} is not next, register series {expected} first")]
    OutOfOrderSeries { expected: u8, got: u8 },
    #[error("series {0} is already registered")]
    SeriesAlreadyRegistered(u8),
    #[error("series {0} is not part of the plan")]
    UnknownSeries(u8),
    #[error("series count has not been defined yet")]
    SeriesNotPlanned,
    #[error("only {registered} of {planned} series registered")]
    ExerciseIncomplete { registered: usize, planned: u8 },
    #[error("exercise {0} is not in the catalog")]
    UnknownExercise(String),
    #[error("exercise name must have at least 3 characters")]
    ExerciseNameTooShort,
    #[error("unknown muscle group `{0}`")]
    UnknownMuscleGroup(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid email address `{0}`")]
    InvalidEmail(String),
    #[error("{field} must be a number, got `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    #[error("page numbers start at 1")]
    ZeroPage,
}

/// Failures reported by the remote workout API or the transport under it
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("already exists: {0}")]
    Conflict(String),
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}

/// Illegal mutations of the session data model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("workout status cannot change from {from} to {to}")]
    IllegalTransition { from: &'static str, to: &'static str },
}

/// How a failure should be presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inline, specific, never fatal
    Validation,
    /// Route the user to a resume path
    Conflict,
    /// Generic message with a retry affordance
    Transient,
    /// Abandon the flow and re-authenticate
    Fatal,
}

/// Errors returned by the workout execution controller
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("cannot {action} while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Invalid(_) | ExecutionError::WrongPhase { .. } => ErrorKind::Validation,
            ExecutionError::Model(_) => ErrorKind::Validation,
            ExecutionError::Service(err) => err.kind(),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Unauthorized(_) => ErrorKind::Fatal,
            ServiceError::Api { .. } | ServiceError::Network(_) | ServiceError::Decode(_) => {
                ErrorKind::Transient
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_never_fatal() {
        let err = ExecutionError::from(ValidationError::NonPositiveReps);
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = ExecutionError::WrongPhase { action: "register a series", phase: "planning" };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_service_error_kinds() {
        assert_eq!(ServiceError::Conflict("today".into()).kind(), ErrorKind::Conflict);
        assert_eq!(ServiceError::Unauthorized("expired".into()).kind(), ErrorKind::Fatal);
        assert_eq!(ServiceError::Network("timeout".into()).kind(), ErrorKind::Transient);
        let api = ServiceError::Api { status: 500, message: "boom".into() };
        assert_eq!(ExecutionError::from(api).kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_messages_are_specific() {
        let err = ValidationError::OutOfOrderSeries { expected: 2, got: 3 };
        assert_eq!(err.to_string(), "series 3 is not next, register series 2 first");
    }
}
