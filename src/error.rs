//! Engine-wide error types
//!
//! Provides a unified error type for the workflow engine. Every rejection a
//! caller can recover from is a typed value, never a panic; the only fatal
//! condition is a persistence failure, which surfaces as [`EngineError::Database`]
//! after the surrounding transaction has rolled back.

use std::collections::HashMap;
use thiserror::Error;

/// Machine-readable reason a requested transition was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    /// `from` and `to` name the same status; self-loops are never admitted
    NoOpTransition,
    /// The edge is not part of the workflow graph
    IllegalTransition,
    /// The edge exists but the actor's role is not allowed to traverse it
    Forbidden,
    /// A status is not a node of the bound workflow definition
    /// (data corruption or a stale client after a definition swap)
    UnknownStatus,
    /// The task changed under the caller between read and write
    ConcurrentModification,
}

impl RejectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoOpTransition => "no_op_transition",
            Self::IllegalTransition => "illegal_transition",
            Self::Forbidden => "forbidden",
            Self::UnknownStatus => "unknown_status",
            Self::ConcurrentModification => "concurrent_modification",
        }
    }
}

impl std::fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A refused status change: the code for machines, the message for humans
///
/// Returned by [`crate::workflow::validate`] and carried through
/// [`EngineError::Rejected`] when a change is requested for real. A rejection
/// always leaves the task untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: RejectionCode,
    pub message: String,
}

impl Rejection {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Rejection {}

/// Field-keyed validation errors for schedule input
///
/// Mirrors the `validator` crate's output in a shape that serializes cleanly
/// for API consumers, supporting multiple messages per field.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    /// Map of field names to their validation error messages
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error for a specific field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert from the validator crate's error type
    pub fn from_validator(errors: validator::ValidationErrors) -> Self {
        let mut result = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed for field '{}'", field));
                result.add(field.to_string(), message);
            }
        }
        result
    }

    /// Convert to a JSON value for API responses
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": "The given data was invalid.",
            "errors": self.errors
        })
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: {:?}", self.errors)
    }
}

impl std::error::Error for ValidationErrors {}

/// Unified error type for the workflow engine
///
/// Implements `From<sea_orm::DbErr>` so storage errors propagate with `?`.
///
/// # Example
///
/// ```rust,ignore
/// use taskflow::{EngineError, WorkflowOrchestrator};
///
/// match orchestrator.change_status(task_id, "cancelled", &actor).await {
///     Ok(task) => println!("now {}", task.status),
///     Err(EngineError::Rejected(rejection)) => println!("refused: {}", rejection),
///     Err(other) => return Err(other),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A status change was refused; the task is unmodified
    #[error("transition rejected: {0}")]
    Rejected(Rejection),

    /// A workflow graph failed construction validation
    #[error("invalid workflow definition: {message}")]
    InvalidDefinition {
        /// What the graph got wrong
        message: String,
    },

    /// A schedule carries an impossible range or an inverted time window
    #[error("invalid schedule: {message}")]
    InvalidScheduleRange {
        /// What the schedule got wrong
        message: String,
    },

    /// Schedule input failed field validation
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// A referenced row does not exist
    #[error("{model_name} not found")]
    ModelNotFound {
        /// The name of the model that was not found
        model_name: String,
    },

    /// Storage failure; the transaction was rolled back, the caller may retry
    #[error("database error: {0}")]
    Database(String),

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl EngineError {
    /// Create a Rejected error from a code and message
    pub fn rejected(code: RejectionCode, message: impl Into<String>) -> Self {
        Self::Rejected(Rejection::new(code, message))
    }

    /// Create an InvalidDefinition error
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Create an InvalidScheduleRange error
    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        Self::InvalidScheduleRange {
            message: message.into(),
        }
    }

    /// Create a ModelNotFound error
    pub fn model_not_found(name: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model_name: name.into(),
        }
    }

    /// Create a Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code for this error, for the transport layer
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected(rejection) => match rejection.code {
                RejectionCode::Forbidden => 403,
                RejectionCode::ConcurrentModification => 409,
                RejectionCode::UnknownStatus => 409,
                RejectionCode::NoOpTransition | RejectionCode::IllegalTransition => 422,
            },
            Self::InvalidDefinition { .. } => 422,
            Self::InvalidScheduleRange { .. } => 422,
            Self::Validation(_) => 422,
            Self::ModelNotFound { .. } => 404,
            Self::Database(_) => 500,
            Self::Internal { .. } => 500,
        }
    }
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

// Implement From<DbErr> for automatic error conversion with ?
impl From<sea_orm::DbErr> for EngineError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejection_codes_map_to_status_codes() {
        let cases = [
            (RejectionCode::NoOpTransition, 422),
            (RejectionCode::IllegalTransition, 422),
            (RejectionCode::Forbidden, 403),
            (RejectionCode::UnknownStatus, 409),
            (RejectionCode::ConcurrentModification, 409),
        ];
        for (code, expected) in cases {
            let err = EngineError::rejected(code, "refused");
            assert_eq!(err.status_code(), expected, "code {}", code);
        }
    }

    #[test]
    fn validation_errors_collect_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("monthly_day", "must be between 1 and 31");
        errors.add("monthly_day", "is required for monthly schedules");

        assert!(!errors.is_empty());
        assert_eq!(errors.errors["monthly_day"].len(), 2);
        assert_eq!(EngineError::Validation(errors).status_code(), 422);
    }

    #[test]
    fn db_errors_convert_with_question_mark() {
        fn load() -> Result<(), EngineError> {
            Err(sea_orm::DbErr::Custom("connection reset".into()))?
        }
        match load() {
            Err(EngineError::Database(message)) => assert!(message.contains("connection reset")),
            other => panic!("expected database error, got {:?}", other),
        }
    }
}
