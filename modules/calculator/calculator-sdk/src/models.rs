//! Public models for the calculator module.
//!
//! These are transport-agnostic data structures that define the contract
//! between the calculation pipeline and its consumers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::CalculationFailure;

/// Store-assigned record identifier.
pub type RecordId = i64;

/// The four supported arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

// Localized aliases are the lowercase Russian names: "slozhenie",
// "vychitanie", "umnozhenie" and "delenie".
const ADD_ALIASES: &[&str] = &[
    "add",
    "sum",
    "plus",
    "+",
    "\u{0441}\u{043b}\u{043e}\u{0436}\u{0435}\u{043d}\u{0438}\u{0435}",
];
const SUBTRACT_ALIASES: &[&str] = &[
    "subtract",
    "minus",
    "sub",
    "-",
    "\u{0432}\u{044b}\u{0447}\u{0438}\u{0442}\u{0430}\u{043d}\u{0438}\u{0435}",
];
const MULTIPLY_ALIASES: &[&str] = &[
    "multiply",
    "mul",
    "times",
    "*",
    "\u{0443}\u{043c}\u{043d}\u{043e}\u{0436}\u{0435}\u{043d}\u{0438}\u{0435}",
];
const DIVIDE_ALIASES: &[&str] = &[
    "divide",
    "division",
    "div",
    "/",
    "\u{0434}\u{0435}\u{043b}\u{0435}\u{043d}\u{0438}\u{0435}",
];

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// Canonical name, as stored in history.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Operation::Add => ADD_ALIASES,
            Operation::Subtract => SUBTRACT_ALIASES,
            Operation::Multiply => MULTIPLY_ALIASES,
            Operation::Divide => DIVIDE_ALIASES,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an operation name matches none of the known aliases.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| UnknownOperation(s.to_owned()))
    }
}

/// One persisted calculation attempt.
///
/// `result` is `None` when the attempt failed (division by zero or an
/// unrecognized operation); such rows are kept in history all the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub id: RecordId,
    pub operand1: f64,
    pub operand2: f64,
    pub operation: String,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat broker projection of a [`CalculationRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationEvent {
    pub id: RecordId,
    pub operand1: f64,
    pub operand2: f64,
    pub operation: String,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CalculationRecord> for CalculationEvent {
    fn from(record: &CalculationRecord) -> Self {
        Self {
            id: record.id,
            operand1: record.operand1,
            operand2: record.operand2,
            operation: record.operation.clone(),
            result: record.result,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Result of `calculate` / `update`: the value, a success flag and, on
/// failure, the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOutcome {
    /// Id of the record written by this call, if any.
    pub record_id: Option<RecordId>,
    pub result: Option<f64>,
    pub success: bool,
    pub failure: Option<CalculationFailure>,
}

impl CalculationOutcome {
    #[must_use]
    pub fn succeeded(record_id: RecordId, result: f64) -> Self {
        Self {
            record_id: Some(record_id),
            result: Some(result),
            success: true,
            failure: None,
        }
    }

    #[must_use]
    pub fn failed(record_id: Option<RecordId>, failure: CalculationFailure) -> Self {
        Self {
            record_id,
            result: None,
            success: false,
            failure: Some(failure),
        }
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>(), Ok(op));
        }
    }

    #[test]
    fn parsing_is_case_insensitive_and_trims() {
        assert_eq!("  SUM ".parse::<Operation>(), Ok(Operation::Add));
        assert_eq!("Minus".parse::<Operation>(), Ok(Operation::Subtract));
        assert_eq!("Division".parse::<Operation>(), Ok(Operation::Divide));
    }

    #[test]
    fn parses_localized_aliases() {
        let upper_delenie = "\u{0414}\u{0435}\u{043b}\u{0435}\u{043d}\u{0438}\u{0435}";
        assert_eq!(upper_delenie.parse::<Operation>(), Ok(Operation::Divide));
        assert_eq!(MULTIPLY_ALIASES[4].parse::<Operation>(), Ok(Operation::Multiply));
    }

    #[test]
    fn unknown_operation_keeps_original_text() {
        let err = " Frobnicate".parse::<Operation>().unwrap_err();
        assert_eq!(err, UnknownOperation(" Frobnicate".to_owned()));
        assert_eq!(err.to_string(), "Invalid operation:  Frobnicate");
    }

    #[test]
    fn event_serializes_as_flat_object_with_null_result() {
        let now = Utc::now();
        let record = CalculationRecord {
            id: 7,
            operand1: 5.0,
            operand2: 0.0,
            operation: "divide".to_owned(),
            result: None,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(CalculationEvent::from(&record)).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["operation"], "divide");
        assert!(value["result"].is_null());
        assert!(value.get("created_at").is_some());
    }

    #[test]
    fn outcome_error_message_comes_from_failure() {
        let outcome = CalculationOutcome::failed(Some(3), CalculationFailure::DivisionByZero);
        assert!(!outcome.success);
        assert_eq!(outcome.error_message().as_deref(), Some("Division by zero"));

        let ok = CalculationOutcome::succeeded(4, 2.0);
        assert!(ok.success);
        assert_eq!(ok.error_message(), None);
    }
}
