//! Error types for the calculator SDK.

use thiserror::Error;

use crate::models::RecordId;

/// Why a calculation or an update did not produce a usable result.
///
/// These are business outcomes, carried inside `CalculationOutcome`
/// rather than returned as `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalculationFailure {
    #[error("Invalid operation: {operation}")]
    InvalidOperation { operation: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Record not found: {id}")]
    NotFound { id: RecordId },

    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl CalculationFailure {
    #[must_use]
    pub fn invalid_operation(operation: impl Into<String>) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Short machine-readable label, used for metrics and problem codes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOperation { .. } => "invalid_operation",
            Self::DivisionByZero => "division_by_zero",
            Self::NotFound { .. } => "not_found",
            Self::Persistence { .. } => "persistence",
        }
    }
}

/// Errors returned by the read and delete operations of `CalculatorApi`.
#[derive(Error, Debug, Clone)]
pub enum CalculatorError {
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl CalculatorError {
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}
