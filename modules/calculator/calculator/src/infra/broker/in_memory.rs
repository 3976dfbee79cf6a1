//! In-process broker.
//!
//! Each topic is a log with one committed offset per consumer group. A
//! message is dropped once every group that subscribed to the topic has
//! committed past it, or when the topic holds more than `retention` messages.
//! Offsets keep counting across dropped messages. Clones share the same
//! state, so a producer handle and a consumer handle can be taken from one
//! broker.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{BrokerError, Delivery, Message, MessageBroker, MessageProducer, Offset, Subscription};

/// Messages kept per topic when nobody consumes them.
pub const DEFAULT_RETENTION: usize = 10_000;

#[derive(Default)]
struct TopicLog {
    /// Offset of `messages[0]`.
    base: Offset,
    messages: VecDeque<Message>,
    groups: HashSet<String>,
    committed: HashMap<String, Offset>,
}

impl TopicLog {
    fn get(&self, offset: Offset) -> Option<&Message> {
        let index = usize::try_from(offset.checked_sub(self.base)?).ok()?;
        self.messages.get(index)
    }

    fn append(&mut self, message: Message, retention: usize) -> Offset {
        self.messages.push_back(message);
        let offset = self.base + to_offset(self.messages.len() - 1);
        while self.messages.len() > retention {
            self.messages.pop_front();
            self.base += 1;
        }
        offset
    }

    /// Drop everything every subscribed group has committed.
    fn trim_committed(&mut self) {
        let lowest = self
            .groups
            .iter()
            .map(|g| self.committed.get(g).copied().unwrap_or(self.base))
            .min();
        let Some(lowest) = lowest else {
            return;
        };
        let consumed = usize::try_from(lowest.saturating_sub(self.base))
            .unwrap_or(usize::MAX)
            .min(self.messages.len());
        self.messages.drain(..consumed);
        self.base += to_offset(consumed);
    }
}

struct Shared {
    topics: Mutex<HashMap<String, TopicLog>>,
    available: AtomicBool,
    auto_create_topics: bool,
    retention: usize,
    appended: Notify,
}

#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Broker that creates topics on first use and keeps up to
    /// [`DEFAULT_RETENTION`] messages per topic.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Broker keeping at most `retention` messages per topic (at least one).
    #[must_use]
    pub fn with_retention(retention: usize) -> Self {
        Self::build(true, retention, std::iter::empty::<&str>())
    }

    /// Broker that only knows `topics`; anything else is
    /// [`BrokerError::UnknownTopic`].
    #[cfg(test)]
    pub(crate) fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(false, DEFAULT_RETENTION, topics)
    }

    fn build<I, S>(auto_create_topics: bool, retention: usize, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics = topics
            .into_iter()
            .map(|t| (t.as_ref().to_owned(), TopicLog::default()))
            .collect();
        Self {
            shared: Arc::new(Shared {
                topics: Mutex::new(topics),
                available: AtomicBool::new(true),
                auto_create_topics,
                retention: retention.max(1),
                appended: Notify::new(),
            }),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
        self.shared.appended.notify_waiters();
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    /// Messages still held for `topic`, in offset order.
    #[must_use]
    pub fn messages(&self, topic: &str) -> Vec<Message> {
        self.shared
            .topics
            .lock()
            .get(topic)
            .map(|log| log.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Next offset `group` will read from `topic`, if it ever committed.
    #[must_use]
    pub fn committed_offset(&self, topic: &str, group: &str) -> Option<Offset> {
        self.shared
            .topics
            .lock()
            .get(topic)
            .and_then(|log| log.committed.get(group).copied())
    }

    fn ensure_available(&self) -> Result<(), BrokerError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(BrokerError::Unavailable)
        }
    }

    fn with_topic<T>(
        &self,
        topic: &str,
        f: impl FnOnce(&mut TopicLog) -> T,
    ) -> Result<T, BrokerError> {
        let mut topics = self.shared.topics.lock();
        if let Some(log) = topics.get_mut(topic) {
            return Ok(f(log));
        }
        if !self.shared.auto_create_topics {
            return Err(BrokerError::UnknownTopic {
                topic: topic.to_owned(),
            });
        }
        Ok(f(topics.entry(topic.to_owned()).or_default()))
    }
}

fn to_offset(index: usize) -> Offset {
    Offset::try_from(index).unwrap_or(Offset::MAX)
}

#[async_trait]
impl MessageProducer for InMemoryBroker {
    async fn send(&self, topic: &str, message: Message) -> Result<Offset, BrokerError> {
        self.ensure_available()?;
        let retention = self.shared.retention;
        let offset = self.with_topic(topic, |log| log.append(message, retention))?;
        self.shared.appended.notify_waiters();
        Ok(offset)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        self.ensure_available()?;
        let position = self.with_topic(topic, |log| {
            log.groups.insert(group.to_owned());
            log.committed.get(group).copied().unwrap_or(log.base)
        })?;
        Ok(Box::new(InMemorySubscription {
            broker: self.clone(),
            topic: topic.to_owned(),
            group: group.to_owned(),
            position,
        }))
    }
}

struct InMemorySubscription {
    broker: InMemoryBroker,
    topic: String,
    group: String,
    position: Offset,
}

impl InMemorySubscription {
    fn next_delivery(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let position = self.position;
        let found = self.broker.with_topic(&self.topic, |log| {
            // Anything below the base was dropped by retention; skip ahead.
            let offset = position.max(log.base);
            log.get(offset).cloned().map(|message| (offset, message))
        })?;
        Ok(found.map(|(offset, message)| {
            self.position = offset + 1;
            Delivery {
                topic: self.topic.clone(),
                partition: 0,
                offset,
                message,
            }
        }))
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Delivery>, BrokerError> {
        let deadline = Instant::now() + timeout;
        let shared = Arc::clone(&self.broker.shared);
        loop {
            // Registered before the log is checked so a concurrent send
            // cannot slip between the check and the wait.
            let appended = shared.appended.notified();

            self.broker.ensure_available()?;
            if let Some(delivery) = self.next_delivery()? {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), BrokerError> {
        self.broker.ensure_available()?;
        let next = delivery.offset + 1;
        self.broker.with_topic(&delivery.topic, |log| {
            let committed = log.committed.entry(self.group.clone()).or_default();
            *committed = (*committed).max(next);
            log.trim_committed();
        })
    }
}
