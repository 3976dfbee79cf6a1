use std::collections::VecDeque;

use async_trait::async_trait;
use calculator_sdk::{CalculationEvent, RecordId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Processed,
    /// Already seen (redelivery) or older than what is already known.
    Duplicate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event handler failed: {message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Receives every decoded event drained by the consumer.
///
/// Delivery is at-least-once, so implementations must tolerate the same
/// event more than once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: CalculationEvent) -> Result<HandleOutcome, HandlerError>;
}

/// Records remembered by [`EventIndex::new`].
pub const DEFAULT_INDEX_CAPACITY: usize = 10_000;

/// Latest known event per record id, for at most `capacity` records.
///
/// When full, the record first seen longest ago is forgotten. A forgotten
/// record that is delivered again counts as new.
pub struct EventIndex {
    events: DashMap<RecordId, CalculationEvent>,
    arrival: Mutex<VecDeque<RecordId>>,
    capacity: usize,
}

impl Default for EventIndex {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INDEX_CAPACITY)
    }
}

impl EventIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index remembering at most `capacity` records (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: DashMap::new(),
            arrival: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<CalculationEvent> {
        self.events.get(&id).map(|e| e.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    // Must not be called while holding a map entry for `id`.
    fn remember(&self, id: RecordId) {
        let evicted = {
            let mut arrival = self.arrival.lock();
            arrival.push_back(id);
            if arrival.len() > self.capacity {
                arrival.pop_front()
            } else {
                None
            }
        };
        if let Some(oldest) = evicted {
            self.events.remove(&oldest);
            debug!(record_id = oldest, "Calculation event evicted from index");
        }
    }
}

#[async_trait]
impl EventHandler for EventIndex {
    async fn handle(&self, event: CalculationEvent) -> Result<HandleOutcome, HandlerError> {
        let id = event.id;
        match self.events.entry(id) {
            Entry::Occupied(existing)
                if *existing.get() == event || existing.get().updated_at > event.updated_at =>
            {
                Ok(HandleOutcome::Duplicate)
            }
            Entry::Occupied(mut existing) => {
                info!(record_id = id, operation = %event.operation, result = ?event.result, "Calculation event updated");
                existing.insert(event);
                Ok(HandleOutcome::Processed)
            }
            Entry::Vacant(slot) => {
                info!(record_id = id, operation = %event.operation, result = ?event.result, "Calculation event received");
                slot.insert(event);
                self.remember(id);
                Ok(HandleOutcome::Processed)
            }
        }
    }
}
