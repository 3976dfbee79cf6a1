//! Entity to domain model mappers.

use calculator_sdk::CalculationRecord;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};

use super::entity;
use crate::domain::repo::NewCalculation;

impl From<entity::Model> for CalculationRecord {
    fn from(model: entity::Model) -> Self {
        Self {
            id: model.id,
            operand1: model.operand1,
            operand2: model.operand2,
            operation: model.operation,
            result: model.result,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Insert model for a new calculation; the id is left to the database.
pub fn new_calculation_to_active_model(
    new: NewCalculation,
    now: DateTime<Utc>,
) -> entity::ActiveModel {
    entity::ActiveModel {
        id: NotSet,
        operand1: Set(new.operand1),
        operand2: Set(new.operand2),
        operation: Set(new.operation),
        result: Set(new.result),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod mapper_test;
