//! [`HistoryStore`] decorator that records database metrics for every call.

use std::sync::Arc;

use async_trait::async_trait;
use calculator_sdk::{CalculationRecord, RecordId};

use crate::domain::error::DomainError;
use crate::domain::repo::{HistoryStore, NewCalculation};
use crate::metrics::{CalculatorMetrics, status};

pub struct MeteredHistoryStore<S> {
    inner: S,
    metrics: Arc<CalculatorMetrics>,
}

impl<S: HistoryStore> MeteredHistoryStore<S> {
    #[must_use]
    pub fn new(inner: S, metrics: Arc<CalculatorMetrics>) -> Self {
        Self { inner, metrics }
    }

    fn record<T>(
        &self,
        operation: &str,
        result: &Result<T, DomainError>,
        found: impl FnOnce(&T) -> bool,
    ) {
        let label = match result {
            Ok(value) if found(value) => status::SUCCESS,
            Ok(_) | Err(DomainError::NotFound { .. }) => status::NOT_FOUND,
            Err(_) => status::ERROR,
        };
        self.metrics.record_db_operation(operation, label);
    }
}

#[async_trait]
impl<S: HistoryStore> HistoryStore for MeteredHistoryStore<S> {
    async fn append(&self, new: NewCalculation) -> Result<CalculationRecord, DomainError> {
        let _timer = self.metrics.start_db_operation("append");
        let result = self.inner.append(new).await;
        self.record("append", &result, |_| true);
        result
    }

    async fn list(&self) -> Result<Vec<CalculationRecord>, DomainError> {
        let _timer = self.metrics.start_db_operation("list");
        let result = self.inner.list().await;
        self.record("list", &result, |_| true);
        result
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<CalculationRecord>, DomainError> {
        let _timer = self.metrics.start_db_operation("get_by_id");
        let result = self.inner.get_by_id(id).await;
        self.record("get_by_id", &result, Option::is_some);
        result
    }

    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> Result<CalculationRecord, DomainError> {
        let _timer = self.metrics.start_db_operation("update");
        let result = self.inner.update(id, operand1, operand2, operation).await;
        self.record("update", &result, |_| true);
        result
    }

    async fn delete(&self, id: RecordId) -> Result<bool, DomainError> {
        let _timer = self.metrics.start_db_operation("delete");
        let result = self.inner.delete(id).await;
        self.record("delete", &result, |deleted| *deleted);
        result
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let _timer = self.metrics.start_db_operation("ping");
        let result = self.inner.ping().await;
        self.record("ping", &result, |_| true);
        result
    }
}
