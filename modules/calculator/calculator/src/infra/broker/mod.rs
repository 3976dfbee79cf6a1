//! Message broker contract.
//!
//! Modeled on a partitioned log: producers append to a topic, consumer
//! groups read it through a [`Subscription`] and commit offsets. Delivery is
//! at-least-once; anything read but not committed is delivered again to the
//! next subscription of the same group.
//!
//! [`connect`] picks the implementation named by [`BrokerConfig::kind`].

mod in_memory;
#[cfg(feature = "kafka")]
mod kafka;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{BrokerConfig, BrokerKind};

pub use in_memory::{DEFAULT_RETENTION, InMemoryBroker};
#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;

/// Offset of a message within its partition.
pub type Offset = u64;

/// Partition of a topic. The in-memory broker has one, numbered 0.
pub type Partition = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl Message {
    /// Unkeyed message; the broker is free to place it anywhere.
    #[must_use]
    pub fn unkeyed(payload: Vec<u8>) -> Self {
        Self { key: None, payload }
    }
}

/// A message handed to a consumer, with the coordinates needed to commit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: Partition,
    pub offset: Offset,
    pub message: Message,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker unavailable")]
    Unavailable,

    #[error("unknown topic: {topic}")]
    UnknownTopic { topic: String },

    #[error("broker client error: {message}")]
    Client { message: String },
}

#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Append `message` to `topic` and return its offset.
    async fn send(&self, topic: &str, message: Message) -> Result<Offset, BrokerError>;
}

#[async_trait]
pub trait MessageBroker: MessageProducer {
    /// Join `group` on `topic`, resuming from the group's committed offset.
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError>;
}

#[async_trait]
pub trait Subscription: Send {
    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived in time.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Delivery>, BrokerError>;

    /// Mark `delivery` and everything before it as processed for the group.
    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError>;
}

/// Build the broker selected by `config.kind`.
///
/// # Errors
/// [`BrokerError::Client`] if the Kafka client cannot be created, or if Kafka
/// is selected in a build without the `kafka` feature.
pub fn connect(config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>, BrokerError> {
    match config.kind {
        BrokerKind::InMemory => Ok(Arc::new(InMemoryBroker::with_retention(config.retention))),
        #[cfg(feature = "kafka")]
        BrokerKind::Kafka => Ok(Arc::new(KafkaBroker::new(config)?)),
        #[cfg(not(feature = "kafka"))]
        BrokerKind::Kafka => Err(BrokerError::Client {
            message: "kafka broker selected but this build lacks the `kafka` feature".to_owned(),
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_is_the_default_broker() {
        let broker = connect(&BrokerConfig::default()).unwrap();
        let offset = broker.send("t", Message::unkeyed(b"x".to_vec())).await.unwrap();
        assert_eq!(offset, 0);

        let mut sub = broker.subscribe("t", "g").await.unwrap();
        let delivery = sub.poll(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(delivery.partition, 0);
    }

    #[cfg(not(feature = "kafka"))]
    #[test]
    fn kafka_needs_the_feature() {
        let config = BrokerConfig {
            kind: BrokerKind::Kafka,
            ..BrokerConfig::default()
        };
        let Err(BrokerError::Client { message }) = connect(&config) else {
            panic!("kafka broker built without the feature");
        };
        assert!(message.contains("`kafka` feature"));
    }
}
