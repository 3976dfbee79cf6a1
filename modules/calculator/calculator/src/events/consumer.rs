//! Background consumer of calculation events.
//!
//! One long-lived task per process. Cancellation is observed between
//! messages only: a message that has been polled is always handled and
//! committed before the task stops.

use std::sync::Arc;
use std::time::Duration;

use calculator_sdk::CalculationEvent;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{EventHandler, HandleOutcome};
use crate::config::ConsumerConfig;
use crate::infra::broker::{Delivery, MessageBroker, Subscription};
use crate::metrics::CalculatorMetrics;

/// Status labels for `events_consumed_total`.
pub mod status {
    pub const PROCESSED: &str = "processed";
    pub const DUPLICATE: &str = "duplicate";
    pub const DECODE_ERROR: &str = "decode_error";
    pub const HANDLER_ERROR: &str = "handler_error";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Starting,
    Polling,
    Stopping,
    Stopped,
}

pub struct ConsumerHandle {
    pub state: watch::Receiver<ConsumerState>,
    join: JoinHandle<()>,
}

impl ConsumerHandle {
    #[must_use]
    pub fn current_state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Wait until the consumer reports `target`. Returns `false` if the task
    /// ended without ever reaching it.
    pub async fn wait_for(&mut self, target: ConsumerState) -> bool {
        self.state.wait_for(|s| *s == target).await.is_ok()
    }

    /// Wait for the task to finish. Cancel its token first.
    ///
    /// # Errors
    /// Returns the [`JoinError`] if the task panicked.
    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}

/// Doubling delay, capped.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial.min(max),
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.next = self.initial.min(self.max);
    }
}

pub struct EventConsumer {
    broker: Arc<dyn MessageBroker>,
    handler: Arc<dyn EventHandler>,
    topic: String,
    config: ConsumerConfig,
    metrics: Arc<CalculatorMetrics>,
}

impl EventConsumer {
    #[must_use]
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        handler: Arc<dyn EventHandler>,
        topic: impl Into<String>,
        config: ConsumerConfig,
        metrics: Arc<CalculatorMetrics>,
    ) -> Self {
        Self {
            broker,
            handler,
            topic: topic.into(),
            config,
            metrics,
        }
    }

    /// Start the consumer task. It runs until `cancel` fires.
    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> ConsumerHandle {
        let (state_tx, state_rx) = watch::channel(ConsumerState::Starting);
        let join = tokio::spawn(self.run(cancel, state_tx));
        ConsumerHandle {
            state: state_rx,
            join,
        }
    }

    async fn run(self, cancel: CancellationToken, state: watch::Sender<ConsumerState>) {
        info!(topic = %self.topic, group = %self.config.group, "Event consumer starting");

        if let Some(mut subscription) = self.subscribe(&cancel).await {
            state.send_replace(ConsumerState::Polling);
            self.poll_loop(subscription.as_mut(), &cancel).await;
            state.send_replace(ConsumerState::Stopping);
            drop(subscription);
        } else {
            state.send_replace(ConsumerState::Stopping);
        }

        state.send_replace(ConsumerState::Stopped);
        info!(topic = %self.topic, "Event consumer stopped");
    }

    /// `None` only when cancelled before a subscription succeeded.
    async fn subscribe(&self, cancel: &CancellationToken) -> Option<Box<dyn Subscription>> {
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.broker.subscribe(&self.topic, &self.config.group).await {
                Ok(subscription) => {
                    info!(topic = %self.topic, group = %self.config.group, "Subscribed to calculation events");
                    return Some(subscription);
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(topic = %self.topic, error = %e, retry_in = ?delay, "Subscribe failed, retrying");
                    if !sleep_or_cancel(delay, cancel).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn poll_loop(&self, subscription: &mut dyn Subscription, cancel: &CancellationToken) {
        let mut backoff = Backoff::new(self.config.initial_backoff, self.config.max_backoff);
        loop {
            let polled = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("Event consumer cancelled");
                    break;
                }

                polled = subscription.poll(self.config.poll_timeout) => polled,
            };

            match polled {
                Ok(Some(delivery)) => {
                    backoff.reset();
                    self.process(subscription, delivery).await;
                }
                Ok(None) => backoff.reset(),
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(topic = %self.topic, error = %e, retry_in = ?delay, "Poll failed");
                    if !sleep_or_cancel(delay, cancel).await {
                        break;
                    }
                }
            }
        }
    }

    async fn process(&self, subscription: &mut dyn Subscription, delivery: Delivery) {
        let label = match serde_json::from_slice::<CalculationEvent>(&delivery.message.payload) {
            Ok(event) => {
                let record_id = event.id;
                match self.handler.handle(event).await {
                    Ok(HandleOutcome::Processed) => status::PROCESSED,
                    Ok(HandleOutcome::Duplicate) => {
                        debug!(record_id, offset = delivery.offset, "Duplicate calculation event");
                        status::DUPLICATE
                    }
                    Err(e) => {
                        error!(record_id, offset = delivery.offset, error = %e, "Calculation event handler failed");
                        status::HANDLER_ERROR
                    }
                }
            }
            Err(e) => {
                warn!(offset = delivery.offset, error = %e, "Skipping undecodable calculation event");
                status::DECODE_ERROR
            }
        };
        self.metrics.record_consumed(label);

        // Failed messages are committed as well; they would fail again.
        if let Err(e) = subscription.commit(&delivery).await {
            warn!(offset = delivery.offset, error = %e, "Offset commit failed, message may be redelivered");
        }
    }
}

/// Returns `false` if cancelled before `delay` elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::events::handler::EventIndex;
    use crate::infra::broker::{InMemoryBroker, Message, MessageProducer};
    use tracing_test::traced_test;

    fn fast_config() -> ConsumerConfig {
        ConsumerConfig {
            poll_timeout: Duration::from_millis(20),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            ..ConsumerConfig::default()
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(3));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            [500, 1000, 2000, 3000, 3000].map(Duration::from_millis).to_vec()
        );

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }

    #[test]
    fn backoff_initial_above_cap_is_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[tokio::test]
    #[traced_test]
    async fn undecodable_message_is_skipped_and_committed() {
        let broker = InMemoryBroker::new();
        let topic = BrokerConfig::default().topic;
        let config = fast_config();
        let group = config.group.clone();
        let metrics = Arc::new(CalculatorMetrics::new("consumer_test").unwrap());
        let index = Arc::new(EventIndex::new());
        broker
            .send(&topic, Message::unkeyed(b"not json".to_vec()))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let consumer = EventConsumer::new(
            Arc::new(broker.clone()),
            index.clone(),
            topic.clone(),
            config,
            metrics.clone(),
        )
        .spawn(cancel.clone());

        tokio::time::timeout(Duration::from_secs(5), async {
            while broker.committed_offset(&topic, &group) != Some(1) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        cancel.cancel();
        consumer.join().await.unwrap();

        assert!(index.is_empty());
        assert_eq!(metrics.consumed(status::DECODE_ERROR), 1);
        assert!(logs_contain("Skipping undecodable calculation event"));
    }
}
