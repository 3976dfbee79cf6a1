use std::sync::Arc;
use std::time::Duration;

use calculator_sdk::{CalculationEvent, CalculationRecord};
use thiserror::Error;

use crate::config::BrokerConfig;
use crate::infra::broker::{BrokerError, Message, MessageProducer};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize calculation event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("broker rejected calculation event: {0}")]
    Broker(#[from] BrokerError),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends one JSON [`CalculationEvent`] per record, unkeyed, to the
/// configured topic. No retries: a failed publish is reported and dropped.
pub struct EventPublisher {
    producer: Arc<dyn MessageProducer>,
    topic: String,
    send_timeout: Duration,
}

impl EventPublisher {
    #[must_use]
    pub fn new(producer: Arc<dyn MessageProducer>, config: &BrokerConfig) -> Self {
        Self {
            producer,
            topic: config.topic.clone(),
            send_timeout: config.send_timeout,
        }
    }

    /// # Errors
    /// [`PublishError::Serialize`] if the event cannot be encoded,
    /// [`PublishError::Broker`] if the broker refuses it and
    /// [`PublishError::Timeout`] if it does not answer within `send_timeout`.
    pub async fn publish(&self, record: &CalculationRecord) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(&CalculationEvent::from(record))?;
        tokio::time::timeout(
            self.send_timeout,
            self.producer.send(&self.topic, Message::unkeyed(payload)),
        )
        .await
        .map_err(|_| PublishError::Timeout(self.send_timeout))??;
        Ok(())
    }
}
