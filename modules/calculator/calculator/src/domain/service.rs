//! Calculation service: compute, persist, publish.

use std::sync::Arc;

use async_trait::async_trait;
use calculator_sdk::{
    CalculationFailure, CalculationOutcome, CalculationRecord, CalculatorApi, CalculatorError,
    Operation, RecordId, UnknownOperation,
};
use tracing::{debug, error, instrument, warn};

use super::arithmetic;
use super::error::DomainError;
use super::repo::{HistoryStore, MAX_OPERATION_LEN, NewCalculation};
use crate::events::publisher::EventPublisher;
use crate::metrics::{CalculatorMetrics, UNKNOWN_OPERATION, status};

/// The one [`CalculatorApi`] implementation.
pub struct CalculatorService {
    store: Arc<dyn HistoryStore>,
    publisher: Option<EventPublisher>,
    metrics: Arc<CalculatorMetrics>,
}

impl CalculatorService {
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>, metrics: Arc<CalculatorMetrics>) -> Self {
        Self {
            store,
            publisher: None,
            metrics,
        }
    }

    /// Publish a [`calculator_sdk::CalculationEvent`] after every persisted
    /// calculation.
    #[must_use]
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<CalculatorMetrics> {
        &self.metrics
    }

    async fn publish(&self, record: &CalculationRecord) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        match publisher.publish(record).await {
            Ok(()) => {
                self.metrics.record_publish(status::SUCCESS);
                debug!(record_id = record.id, "Calculation event published");
            }
            Err(e) => {
                self.metrics.record_publish(status::ERROR);
                warn!(record_id = record.id, error = %e, "Failed to publish calculation event");
            }
        }
    }
}

fn operation_label(parsed: &Result<Operation, UnknownOperation>) -> &'static str {
    parsed.as_ref().map_or(UNKNOWN_OPERATION, |op| op.as_str())
}

/// Rejected operation text as it fits into the history column.
fn stored_operation_text(raw: &str) -> String {
    raw.chars().take(MAX_OPERATION_LEN).collect()
}

#[async_trait]
impl CalculatorApi for CalculatorService {
    #[instrument(skip(self), fields(record_id = tracing::field::Empty))]
    async fn calculate(
        &self,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> CalculationOutcome {
        let parsed = operation.parse::<Operation>();
        let label = operation_label(&parsed);
        let _in_flight = self.metrics.start_calculation(label);

        let (stored_operation, computed) = match parsed {
            Ok(op) => (
                op.as_str().to_owned(),
                arithmetic::evaluate(op, operand1, operand2)
                    .ok_or(CalculationFailure::DivisionByZero),
            ),
            Err(UnknownOperation(raw)) => (
                stored_operation_text(&raw),
                Err(CalculationFailure::invalid_operation(raw)),
            ),
        };

        let new = NewCalculation {
            operand1,
            operand2,
            operation: stored_operation,
            result: computed.as_ref().ok().copied(),
        };
        let record = match self.store.append(new).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to persist calculation");
                self.metrics.record_request(label, status::EXCEPTION);
                return CalculationOutcome::failed(None, e.into());
            }
        };
        tracing::Span::current().record("record_id", record.id);

        self.publish(&record).await;

        match computed {
            Ok(value) => {
                self.metrics.record_request(label, status::SUCCESS);
                CalculationOutcome::succeeded(record.id, value)
            }
            Err(failure) => {
                debug!(kind = failure.kind(), "Calculation failed");
                self.metrics
                    .record_request(label, status::CALCULATION_ERROR);
                CalculationOutcome::failed(Some(record.id), failure)
            }
        }
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> CalculationOutcome {
        let label = operation_label(&operation.parse::<Operation>());
        let _in_flight = self.metrics.start_calculation(label);

        match self.store.update(id, operand1, operand2, operation).await {
            Ok(CalculationRecord {
                result: Some(value),
                ..
            }) => {
                self.metrics.record_request(label, status::SUCCESS);
                CalculationOutcome::succeeded(id, value)
            }
            Ok(_) => {
                self.metrics
                    .record_request(label, status::CALCULATION_ERROR);
                CalculationOutcome::failed(Some(id), CalculationFailure::DivisionByZero)
            }
            Err(e @ (DomainError::NotFound { .. } | DomainError::InvalidOperation { .. })) => {
                debug!(error = %e, "Update rejected");
                self.metrics
                    .record_request(label, status::CALCULATION_ERROR);
                CalculationOutcome::failed(None, e.into())
            }
            Err(e @ DomainError::Persistence { .. }) => {
                error!(error = %e, "Failed to update calculation");
                self.metrics.record_request(label, status::EXCEPTION);
                CalculationOutcome::failed(None, e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RecordId) -> Result<bool, CalculatorError> {
        self.store.delete(id).await.map_err(|e| {
            error!(error = %e, "Failed to delete calculation");
            e.into()
        })
    }

    async fn history(&self) -> Result<Vec<CalculationRecord>, CalculatorError> {
        self.store.list().await.map_err(|e| {
            error!(error = %e, "Failed to load calculation history");
            e.into()
        })
    }

    async fn get(&self, id: RecordId) -> Result<Option<CalculationRecord>, CalculatorError> {
        self.store.get_by_id(id).await.map_err(|e| {
            error!(record_id = id, error = %e, "Failed to load calculation");
            e.into()
        })
    }
}
