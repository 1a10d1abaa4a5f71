//! Error types for the payroll cycle engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every rejection the workflow can produce. Errors are always raised
//! synchronously and never leave a store partially mutated.

use thiserror::Error;

/// The main error type for the payroll cycle engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_cycle::error::WorkflowError;
///
/// let error = WorkflowError::InvalidState {
///     operation: "withdraw_adjustment".to_string(),
///     message: "window is CLOSED".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Invalid state for 'withdraw_adjustment': window is CLOSED"
/// );
/// ```
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// User input was malformed or out of range.
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        /// The input field that failed validation.
        field: String,
        /// A description of what made the value invalid.
        message: String,
    },

    /// An operation was attempted against a state-machine precondition that does not hold.
    #[error("Invalid state for '{operation}': {message}")]
    InvalidState {
        /// The operation that was rejected.
        operation: String,
        /// A description of the unmet precondition.
        message: String,
    },

    /// The targeted entry does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entry that was looked up.
        entity: String,
        /// The identifier that was not found.
        id: String,
    },

    /// The caller lacks the role required for the action.
    #[error("Actor '{actor}' is not allowed to {action}")]
    Forbidden {
        /// The actor that attempted the action.
        actor: String,
        /// The action that was refused.
        action: String,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The reconciliation export could not be written.
    #[error("Export failed: {message}")]
    Export {
        /// A description of the export failure.
        message: String,
    },
}

impl WorkflowError {
    /// Creates a [`WorkflowError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a [`WorkflowError::InvalidState`] error.
    pub fn invalid_state(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a [`WorkflowError::NotFound`] error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<csv::Error> for WorkflowError {
    fn from(err: csv::Error) -> Self {
        Self::Export {
            message: err.to_string(),
        }
    }
}

/// A type alias for Results that return WorkflowError.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
