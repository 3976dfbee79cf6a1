#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for calculator integration tests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use calculator::config::{BrokerConfig, ConsumerConfig, DatabaseConfig};
use calculator::events::EventPublisher;
use calculator::infra::broker::InMemoryBroker;
use calculator::infra::storage::{self, MeteredHistoryStore, SeaOrmHistoryStore};
use calculator::{CalculatorMetrics, CalculatorService};
use sea_orm::DatabaseConnection;

pub fn memory_db_config() -> DatabaseConfig {
    DatabaseConfig {
        dsn: "sqlite::memory:".to_owned(),
        ..DatabaseConfig::default()
    }
}

/// Fresh in-memory SQLite database with the schema applied.
pub async fn migrated_db() -> DatabaseConnection {
    let db = storage::connect(&memory_db_config()).await.unwrap();
    storage::migrate(&db).await.unwrap();
    db
}

pub fn metrics() -> Arc<CalculatorMetrics> {
    Arc::new(CalculatorMetrics::new("test").unwrap())
}

pub fn fast_consumer_config() -> ConsumerConfig {
    ConsumerConfig {
        poll_timeout: Duration::from_millis(20),
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
        ..ConsumerConfig::default()
    }
}

pub struct Pipeline {
    pub service: Arc<CalculatorService>,
    pub broker: InMemoryBroker,
    pub metrics: Arc<CalculatorMetrics>,
}

/// Service over a metered SQLite store, publishing to an in-memory broker.
pub async fn pipeline() -> Pipeline {
    let metrics = metrics();
    let broker = InMemoryBroker::new();
    let store = MeteredHistoryStore::new(SeaOrmHistoryStore::new(migrated_db().await), metrics.clone());
    let publisher = EventPublisher::new(Arc::new(broker.clone()), &BrokerConfig::default());
    let service = CalculatorService::new(Arc::new(store), metrics.clone()).with_publisher(publisher);
    Pipeline {
        service: Arc::new(service),
        broker,
        metrics,
    }
}

/// Polls `condition` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within 5s");
}
