#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::sync::Arc;

use async_trait::async_trait;
use calculator_sdk::{
    CalculationEvent, CalculationFailure, CalculationRecord, CalculatorApi, Operation, RecordId,
};
use chrono::Utc;
use parking_lot::Mutex;

use super::arithmetic;
use super::error::DomainError;
use super::repo::{HistoryStore, NewCalculation};
use super::service::CalculatorService;
use crate::config::BrokerConfig;
use crate::events::EventPublisher;
use crate::infra::broker::InMemoryBroker;
use crate::metrics::{CalculatorMetrics, status};

// Mock store keeping records in a vector
#[derive(Default)]
struct MockStore {
    records: Mutex<Vec<CalculationRecord>>,
    fail_writes: bool,
}

impl MockStore {
    fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn snapshot(&self) -> Vec<CalculationRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl HistoryStore for MockStore {
    async fn append(&self, new: NewCalculation) -> Result<CalculationRecord, DomainError> {
        if self.fail_writes {
            return Err(DomainError::persistence("disk full"));
        }
        let mut records = self.records.lock();
        let now = Utc::now();
        let record = CalculationRecord {
            id: RecordId::try_from(records.len()).unwrap() + 1,
            operand1: new.operand1,
            operand2: new.operand2,
            operation: new.operation,
            result: new.result,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<CalculationRecord>, DomainError> {
        let mut records = self.snapshot();
        records.reverse();
        Ok(records)
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<CalculationRecord>, DomainError> {
        Ok(self.snapshot().into_iter().find(|r| r.id == id))
    }

    async fn update(
        &self,
        id: RecordId,
        operand1: f64,
        operand2: f64,
        operation: &str,
    ) -> Result<CalculationRecord, DomainError> {
        let op: Operation = operation
            .parse()
            .map_err(|_| DomainError::invalid_operation(operation))?;
        if self.fail_writes {
            return Err(DomainError::persistence("disk full"));
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DomainError::NotFound { id })?;
        record.operand1 = operand1;
        record.operand2 = operand2;
        record.operation = op.as_str().to_owned();
        record.result = arithmetic::evaluate(op, operand1, operand2);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: RecordId) -> Result<bool, DomainError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

fn metrics() -> Arc<CalculatorMetrics> {
    Arc::new(CalculatorMetrics::new("test").unwrap())
}

fn service_with(store: Arc<MockStore>) -> (CalculatorService, InMemoryBroker) {
    let broker = InMemoryBroker::new();
    let publisher = EventPublisher::new(Arc::new(broker.clone()), &BrokerConfig::default());
    let service = CalculatorService::new(store, metrics()).with_publisher(publisher);
    (service, broker)
}

fn published(broker: &InMemoryBroker) -> Vec<CalculationEvent> {
    broker
        .messages(calculator_sdk::EVENTS_TOPIC)
        .iter()
        .map(|m| serde_json::from_slice(&m.payload).unwrap())
        .collect()
}

#[tokio::test]
async fn successful_calculation_is_stored_and_published() {
    let store = Arc::new(MockStore::default());
    let (service, broker) = service_with(store.clone());

    let outcome = service.calculate(10.0, 4.0, "subtract").await;

    assert!(outcome.success);
    assert_eq!(outcome.result, Some(6.0));
    assert_eq!(outcome.record_id, Some(1));

    let stored = store.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].operation, "subtract");
    assert_eq!(stored[0].result, Some(6.0));

    let events = published(&broker);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], CalculationEvent::from(&stored[0]));

    let metrics = service.metrics();
    assert_eq!(metrics.requests("subtract", status::SUCCESS), 1);
    assert_eq!(metrics.published(status::SUCCESS), 1);
    assert_eq!(metrics.active_calculations(), 0);
}

#[tokio::test]
async fn aliases_are_stored_normalized() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store.clone());

    service.calculate(2.0, 3.0, "SUM").await;
    service.calculate(2.0, 3.0, "*").await;

    let ops: Vec<_> = store.snapshot().into_iter().map(|r| r.operation).collect();
    assert_eq!(ops, ["add", "multiply"]);
}

#[tokio::test]
async fn division_by_zero_is_stored_with_no_result() {
    let store = Arc::new(MockStore::default());
    let (service, broker) = service_with(store.clone());

    let outcome = service.calculate(5.0, 0.0, "divide").await;

    assert!(!outcome.success);
    assert_eq!(outcome.result, None);
    assert_eq!(outcome.failure, Some(CalculationFailure::DivisionByZero));
    assert_eq!(outcome.error_message().as_deref(), Some("Division by zero"));
    assert_eq!(outcome.record_id, Some(1));
    assert_eq!(store.snapshot()[0].result, None);
    assert_eq!(published(&broker)[0].result, None);
    assert_eq!(
        service.metrics().requests("divide", status::CALCULATION_ERROR),
        1
    );
}

#[tokio::test]
async fn unknown_operation_is_stored_verbatim() {
    let store = Arc::new(MockStore::default());
    let (service, broker) = service_with(store.clone());

    let outcome = service.calculate(1.0, 2.0, "Power").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure,
        Some(CalculationFailure::invalid_operation("Power"))
    );
    let stored = store.snapshot();
    assert_eq!(stored[0].operation, "Power");
    assert_eq!(stored[0].result, None);
    assert_eq!(published(&broker).len(), 1);
    assert_eq!(
        service.metrics().requests("unknown", status::CALCULATION_ERROR),
        1
    );
}

#[tokio::test]
async fn long_unknown_operation_is_truncated_for_storage_only() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store.clone());
    let long = "x".repeat(80);

    let outcome = service.calculate(1.0, 2.0, &long).await;

    assert_eq!(store.snapshot()[0].operation.chars().count(), 50);
    assert_eq!(
        outcome.error_message(),
        Some(format!("Invalid operation: {long}"))
    );
}

#[tokio::test]
async fn store_failure_skips_publish() {
    let (service, broker) = service_with(Arc::new(MockStore::failing()));

    let outcome = service.calculate(1.0, 2.0, "add").await;

    assert!(!outcome.success);
    assert_eq!(outcome.record_id, None);
    assert!(matches!(
        outcome.failure,
        Some(CalculationFailure::Persistence { .. })
    ));
    assert!(broker.messages(calculator_sdk::EVENTS_TOPIC).is_empty());
    assert_eq!(service.metrics().requests("add", status::EXCEPTION), 1);
}

#[tokio::test]
async fn broker_outage_does_not_change_outcome() {
    let store = Arc::new(MockStore::default());
    let (service, broker) = service_with(store.clone());
    broker.set_available(false);

    let outcome = service.calculate(2.0, 2.0, "multiply").await;

    assert!(outcome.success);
    assert_eq!(outcome.result, Some(4.0));
    assert_eq!(store.snapshot().len(), 1);
    assert_eq!(service.metrics().published(status::ERROR), 1);
}

#[tokio::test]
async fn works_without_publisher() {
    let store = Arc::new(MockStore::default());
    let service = CalculatorService::new(store.clone(), metrics());

    let outcome = service.calculate(2.0, 2.0, "add").await;

    assert!(outcome.success);
    assert_eq!(service.metrics().published(status::SUCCESS), 0);
}

#[tokio::test]
async fn update_recomputes_result() {
    let store = Arc::new(MockStore::default());
    let (service, broker) = service_with(store.clone());
    service.calculate(1.0, 1.0, "add").await;

    let outcome = service.update(1, 9.0, 3.0, "divide").await;

    assert!(outcome.success);
    assert_eq!(outcome.result, Some(3.0));
    let record = service.get(1).await.unwrap().unwrap();
    assert_eq!(record.operation, "divide");
    assert_eq!(record.result, Some(3.0));
    assert_eq!(published(&broker).len(), 1, "updates are not published");
}

#[tokio::test]
async fn update_to_division_by_zero_stores_no_result() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store.clone());
    service.calculate(1.0, 1.0, "add").await;

    let outcome = service.update(1, 1.0, 0.0, "divide").await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(CalculationFailure::DivisionByZero));
    assert_eq!(store.snapshot()[0].result, None);
}

#[tokio::test]
async fn update_with_unknown_operation_leaves_record_unchanged() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store.clone());
    service.calculate(1.0, 1.0, "add").await;
    let before = store.snapshot();

    let outcome = service.update(1, 5.0, 5.0, "modulo").await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure,
        Some(CalculationFailure::invalid_operation("modulo"))
    );
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn update_missing_record_is_not_found() {
    let (service, _broker) = service_with(Arc::new(MockStore::default()));

    let outcome = service.update(99, 1.0, 1.0, "add").await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(CalculationFailure::NotFound { id: 99 }));
    assert_eq!(outcome.error_message().as_deref(), Some("Record not found: 99"));
}

#[tokio::test]
async fn update_store_failure_is_persistence() {
    let (service, _broker) = service_with(Arc::new(MockStore::failing()));

    let outcome = service.update(1, 1.0, 1.0, "add").await;

    assert!(matches!(
        outcome.failure,
        Some(CalculationFailure::Persistence { .. })
    ));
    assert_eq!(service.metrics().requests("add", status::EXCEPTION), 1);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store.clone());
    service.calculate(1.0, 1.0, "add").await;

    assert!(service.delete(1).await.unwrap());
    assert!(!service.delete(1).await.unwrap());
    assert!(service.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_newest_first() {
    let store = Arc::new(MockStore::default());
    let (service, _broker) = service_with(store);
    service.calculate(1.0, 1.0, "add").await;
    service.calculate(2.0, 2.0, "add").await;

    let ids: Vec<_> = service
        .history()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, [2, 1]);
}
