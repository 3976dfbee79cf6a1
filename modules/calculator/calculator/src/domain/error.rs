//! Domain errors for the calculator module.

use calculator_sdk::{CalculationFailure, CalculatorError, RecordId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("record not found: {id}")]
    NotFound { id: RecordId },

    #[error("invalid operation: {operation}")]
    InvalidOperation { operation: String },

    /// Storage backend failure (connection, query, transaction).
    #[error("persistence error: {message}")]
    Persistence { message: String },
}

impl DomainError {
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_operation(operation: impl Into<String>) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::persistence(e.to_string())
    }
}

impl From<DomainError> for CalculationFailure {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { id } => Self::NotFound { id },
            DomainError::InvalidOperation { operation } => Self::invalid_operation(operation),
            DomainError::Persistence { message } => Self::persistence(message),
        }
    }
}

impl From<DomainError> for CalculatorError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Persistence { message } => Self::persistence(message),
            other => Self::persistence(other.to_string()),
        }
    }
}
