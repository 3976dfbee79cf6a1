//! `CalculatorApi` trait definition.
//!
//! Contract between the calculation pipeline and whatever drives it
//! (REST handlers, tests, other in-process callers).

use async_trait::async_trait;

use crate::errors::CalculatorError;
use crate::models::{CalculationOutcome, CalculationRecord, RecordId};

/// Public API of the calculation pipeline.
///
/// Business failures (invalid operation, division by zero, missing record)
/// are reported inside [`CalculationOutcome`]; only store failures on the
/// read/delete paths surface as [`CalculatorError`].
#[async_trait]
pub trait CalculatorApi: Send + Sync {
    /// Compute `operand1 <operation> operand2`, persist the attempt and
    /// publish it.
    async fn calculate(&self, operand1: f64, operand2: f64, operation: &str)
    -> CalculationOutcome;

    /// Replace the inputs of an existing record and recompute its result.
    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> CalculationOutcome;

    /// Delete a record. Returns `false` when it did not exist.
    ///
    /// # Errors
    /// Returns [`CalculatorError::Persistence`] when the store fails.
    async fn delete(&self, id: RecordId) -> Result<bool, CalculatorError>;

    /// All records, newest first.
    ///
    /// # Errors
    /// Returns [`CalculatorError::Persistence`] when the store fails.
    async fn history(&self) -> Result<Vec<CalculationRecord>, CalculatorError>;

    /// A single record, or `None` when it does not exist.
    ///
    /// # Errors
    /// Returns [`CalculatorError::Persistence`] when the store fails.
    async fn get(&self, id: RecordId) -> Result<Option<CalculationRecord>, CalculatorError>;
}
