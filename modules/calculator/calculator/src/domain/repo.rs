//! History store contract.

use async_trait::async_trait;
use calculator_sdk::{CalculationRecord, RecordId};

use super::error::DomainError;

/// Width of the stored operation column.
pub const MAX_OPERATION_LEN: usize = 50;

/// A calculation attempt that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalculation {
    pub operand1: f64,
    pub operand2: f64,
    pub operation: String,
    pub result: Option<f64>,
}

/// Durable calculation history.
///
/// A `None` result is a legitimate record (a failed computation), never a
/// reason to reject a write.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a new record; the store assigns the id and both timestamps.
    async fn append(&self, new: NewCalculation) -> Result<CalculationRecord, DomainError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<CalculationRecord>, DomainError>;

    async fn get_by_id(&self, id: RecordId) -> Result<Option<CalculationRecord>, DomainError>;

    /// Replace operands and operation of an existing record and recompute its
    /// result. An unrecognized `operation` fails with
    /// [`DomainError::InvalidOperation`] before anything is touched.
    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> Result<CalculationRecord, DomainError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: RecordId) -> Result<bool, DomainError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), DomainError>;
}
