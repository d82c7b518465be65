//! # Shared Bus - Event Bus for Case Lifecycle Events
//!
//! Carries the facts the lifecycle core emits after a successful, persisted
//! transition to whoever cares: the notification sender, read-side caches,
//! audit exporters.
//!
//! ## Rules
//!
//! - Events are published only **after** the case has been saved.
//! - Consumers never call back into the lifecycle core synchronously.
//! - A slow or missing consumer never blocks or fails the publishing side.
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────────┐
//! │ Lifecycle Service│    publish()       │ Notification Sender  │
//! │                  │ ──────┐            │ Read-side projections│
//! └──────────────────┘       │            └──────────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │ ─────────┘
//!                      └──────────────┘  subscribe()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{CaseEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
