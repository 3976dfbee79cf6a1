use async_trait::async_trait;
use calculator_sdk::{CalculationRecord, Operation, RecordId};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait, QueryOrder, TransactionTrait,
};

use super::entity::{self, Entity as CalculationEntity};
use super::mapper::new_calculation_to_active_model;
use crate::domain::arithmetic;
use crate::domain::error::DomainError;
use crate::domain::repo::{HistoryStore, NewCalculation};

pub struct SeaOrmHistoryStore {
    db: DatabaseConnection,
}

impl SeaOrmHistoryStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HistoryStore for SeaOrmHistoryStore {
    async fn append(&self, new: NewCalculation) -> Result<CalculationRecord, DomainError> {
        let model = new_calculation_to_active_model(new, Utc::now())
            .insert(&self.db)
            .await?;
        Ok(model.into())
    }

    async fn list(&self) -> Result<Vec<CalculationRecord>, DomainError> {
        let models = CalculationEntity::find()
            .order_by_desc(entity::Column::CreatedAt)
            .order_by_desc(entity::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<CalculationRecord>, DomainError> {
        let model = CalculationEntity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> Result<CalculationRecord, DomainError> {
        let operation: Operation = operation
            .parse()
            .map_err(|e: calculator_sdk::UnknownOperation| DomainError::invalid_operation(e.0))?;
        let result = arithmetic::evaluate(operation, operand1, operand2);

        let txn = self.db.begin().await?;
        let existing = CalculationEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound { id })?;

        let mut active: entity::ActiveModel = existing.into();
        active.operand1 = ActiveValue::Set(operand1);
        active.operand2 = ActiveValue::Set(operand2);
        active.operation = ActiveValue::Set(operation.as_str().to_owned());
        active.result = ActiveValue::Set(result);
        active.updated_at = ActiveValue::Set(Utc::now());

        let model = active.update(&txn).await?;
        txn.commit().await?;
        Ok(model.into())
    }

    async fn delete(&self, id: RecordId) -> Result<bool, DomainError> {
        let res = CalculationEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.db.ping().await?;
        Ok(())
    }
}
