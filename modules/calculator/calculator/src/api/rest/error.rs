use axum::http::StatusCode;
use calculator_sdk::{CalculationFailure, CalculatorError};

use super::problem::{Problem, bad_request, internal_error, not_found};
use crate::domain::input::InputError;

/// Map a calculation failure to a Problem. Persistence details stay in the
/// logs.
///
/// Covers every [`CalculationFailure`] so the mapping is total. The create
/// and update handlers never reject [`CalculationFailure::DivisionByZero`]:
/// the record is stored and the failure travels in the response body with
/// `success: false`. The 422 mapping applies only where division by zero
/// ends a request.
pub fn failure_to_problem(failure: &CalculationFailure, instance: &str) -> Problem {
    let problem = match failure {
        CalculationFailure::NotFound { .. } => not_found(failure.to_string()),
        CalculationFailure::InvalidOperation { .. } => bad_request(failure.to_string()),
        CalculationFailure::DivisionByZero => Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Unprocessable Entity",
            failure.to_string(),
        ),
        CalculationFailure::Persistence { message } => {
            tracing::error!(error = %message, "Persistence failure");
            internal_error("An internal database error occurred")
        }
    };
    problem.with_code(failure.kind()).with_instance(instance)
}

pub fn input_error_to_problem(e: &InputError, instance: &str) -> Problem {
    bad_request(e.to_string())
        .with_code("invalid_input")
        .with_instance(instance)
}

impl From<CalculatorError> for Problem {
    fn from(e: CalculatorError) -> Self {
        match e {
            CalculatorError::Persistence { message } => {
                tracing::error!(error = %message, "Persistence failure");
                internal_error("An internal database error occurred").with_code("persistence")
            }
        }
    }
}
