//! # Shared Bus - Ordering Notifications
//!
//! Broadcast channel for the typed events emitted by the certification
//! stages and the graph engine.
//!
//! Stages hand work to each other over dedicated bounded `mpsc` channels;
//! the bus only carries side notifications for operators, the node binary
//! and tests. A slow observer lags and loses old events, it never holds up
//! ordering.
//!
//! ```text
//!  paving ─┐
//!  verify ─┼─ publish() ──► InMemoryEventBus ──► Subscription (filtered)
//!  graph  ─┤                                 └─► EventStream  (filtered)
//!  engine ─┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, LivenessStage, OrderingEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
