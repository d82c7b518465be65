//! # Event Publisher
//!
//! The publishing side of the bus. The lifecycle service publishes one event
//! per persisted transition; a failed or unheard publish never affects the
//! transition itself.

use crate::events::{CaseEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publishing interface used by the lifecycle core's notification adapter.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event, returning the number of subscribers that received it.
    async fn publish(&self, event: CaseEvent) -> usize;

    /// Total number of publish attempts.
    fn events_published(&self) -> u64;
}

/// In-memory bus over `tokio::sync::broadcast`.
///
/// Single-process only. A subscriber sees events sent after it subscribed;
/// one that falls more than the channel capacity behind skips the oldest.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<CaseEvent>,
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, cases = filter.case_ids.len(), "Subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: CaseEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let name = event.name();
        let case_id = event.case_id().clone();

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(event = name, case_id = %case_id, receivers, "Event published");
                receivers
            }
            Err(_) => {
                warn!(event = name, case_id = %case_id, "Event dropped, no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
