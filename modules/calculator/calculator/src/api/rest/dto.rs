//! REST DTOs for the calculator module.

use calculator_sdk::{CalculationOutcome, CalculationRecord, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::input::ComputeRequest;

/// Body of compute and update requests. Operands are text as typed by the
/// user (`"2,5"` is accepted).
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationRequest {
    pub value1: String,
    pub value2: String,
    pub operation: String,
}

impl From<CalculationRequest> for ComputeRequest {
    fn from(req: CalculationRequest) -> Self {
        Self {
            value1: req.value1,
            value2: req.value2,
            operation: req.operation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub record_id: Option<RecordId>,
    pub result: Option<f64>,
    pub success: bool,
    pub error: Option<String>,
}

impl From<CalculationOutcome> for CalculationResponse {
    fn from(outcome: CalculationOutcome) -> Self {
        Self {
            error: outcome.error_message(),
            record_id: outcome.record_id,
            result: outcome.result,
            success: outcome.success,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationDto {
    pub id: RecordId,
    pub operand1: f64,
    pub operand2: f64,
    pub operation: String,
    pub result: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CalculationRecord> for CalculationDto {
    fn from(record: CalculationRecord) -> Self {
        Self {
            id: record.id,
            operand1: record.operand1,
            operand2: record.operand2,
            operation: record.operation,
            result: record.result,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: RecordId,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
}
