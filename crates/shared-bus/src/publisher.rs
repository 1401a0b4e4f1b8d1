//! # Event Publisher
//!
//! Broadcast side of the bus, with per-topic publish counters so operators
//! can see which stage is busy without subscribing.

use crate::events::{EventFilter, EventTopic, OrderingEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// Sink for ordering notifications.
///
/// Nothing on the ordering path reads the bus, so a publish nobody listens
/// to is not an error.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscribers were handed the event.
    async fn publish(&self, event: OrderingEvent) -> usize;

    /// Events published since creation, listened to or not.
    fn events_published(&self) -> u64;
}

#[derive(Debug, Default)]
struct TopicCounters {
    paving: AtomicU64,
    verifying: AtomicU64,
    graphing: AtomicU64,
    engine: AtomicU64,
    liveness: AtomicU64,
}

impl TopicCounters {
    fn slot(&self, topic: EventTopic) -> Option<&AtomicU64> {
        match topic {
            EventTopic::Paving => Some(&self.paving),
            EventTopic::Verifying => Some(&self.verifying),
            EventTopic::Graphing => Some(&self.graphing),
            EventTopic::Engine => Some(&self.engine),
            EventTopic::Liveness => Some(&self.liveness),
            EventTopic::All => None,
        }
    }
}

/// In-process bus over `tokio::sync::broadcast`.
///
/// A subscriber that falls more than `capacity` events behind loses the
/// oldest ones instead of stalling the publishing stage.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<OrderingEvent>,
    published: AtomicU64,
    by_topic: TopicCounters,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
            by_topic: TopicCounters::default(),
            capacity: capacity.max(1),
        }
    }

    /// Receive every later event matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events published on `topic`; `EventTopic::All` gives the total.
    #[must_use]
    pub fn published_on(&self, topic: EventTopic) -> u64 {
        match self.by_topic.slot(topic) {
            Some(counter) => counter.load(Ordering::Relaxed),
            None => self.published.load(Ordering::Relaxed),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: OrderingEvent) -> usize {
        let topic = event.topic();
        let node = event.node();
        self.published.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.by_topic.slot(topic) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        // `send` only fails when nobody is subscribed.
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(?topic, node, receivers, "[bus] event published");
        receivers
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
