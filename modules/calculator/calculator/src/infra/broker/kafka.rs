//! Kafka broker over `rdkafka`.
//!
//! One `FutureProducer` per broker; every subscription gets its own
//! `StreamConsumer` in the requested group with auto-commit off, so offsets
//! move only through [`Subscription::commit`].

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Message as _, Offset as KafkaOffset, TopicPartitionList};
use tracing::{debug, info};

use super::{BrokerError, Delivery, Message, MessageBroker, MessageProducer, Offset, Subscription};
use crate::config::BrokerConfig;

impl From<KafkaError> for BrokerError {
    fn from(e: KafkaError) -> Self {
        Self::Client {
            message: e.to_string(),
        }
    }
}

fn producer_config(config: &BrokerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set(
            "message.timeout.ms",
            config.send_timeout.as_millis().to_string(),
        );
    client
}

fn consumer_config(bootstrap_servers: &str, group: &str) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", group)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest");
    client
}

pub struct KafkaBroker {
    producer: FutureProducer,
    bootstrap_servers: String,
    send_timeout: Duration,
}

impl KafkaBroker {
    /// Create the producer. No connection is made until the first send.
    ///
    /// # Errors
    /// [`BrokerError::Client`] if librdkafka rejects the configuration.
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let producer = producer_config(config).create()?;
        info!(bootstrap_servers = %config.bootstrap_servers, "Kafka producer created");
        Ok(Self {
            producer,
            bootstrap_servers: config.bootstrap_servers.clone(),
            send_timeout: config.send_timeout,
        })
    }
}

fn to_offset(offset: i64) -> Result<Offset, BrokerError> {
    Offset::try_from(offset).map_err(|_| BrokerError::Client {
        message: format!("invalid offset {offset}"),
    })
}

#[async_trait]
impl MessageProducer for KafkaBroker {
    async fn send(&self, topic: &str, message: Message) -> Result<Offset, BrokerError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(topic).payload(message.payload.as_slice());
        if let Some(key) = &message.key {
            record = record.key(key.as_slice());
        }
        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(e, _)| BrokerError::from(e))?;
        debug!(topic, partition, offset, "Message delivered to Kafka");
        to_offset(offset)
    }
}

#[async_trait]
impl MessageBroker for KafkaBroker {
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        let consumer: StreamConsumer = consumer_config(&self.bootstrap_servers, group).create()?;
        consumer.subscribe(&[topic])?;
        Ok(Box::new(KafkaSubscription { consumer }))
    }
}

struct KafkaSubscription {
    consumer: StreamConsumer,
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Delivery>, BrokerError> {
        let Ok(received) = tokio::time::timeout(timeout, self.consumer.recv()).await else {
            return Ok(None);
        };
        let message = received?;
        Ok(Some(Delivery {
            topic: message.topic().to_owned(),
            partition: message.partition(),
            offset: to_offset(message.offset())?,
            message: Message {
                key: message.key().map(<[u8]>::to_vec),
                payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            },
        }))
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
        let next = i64::try_from(delivery.offset + 1).map_err(|_| BrokerError::Client {
            message: format!("offset {} out of range", delivery.offset),
        })?;
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(&delivery.topic, delivery.partition, KafkaOffset::Offset(next))?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }
}
