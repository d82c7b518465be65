//! Notification sender backed by the shared event bus.

use crate::ports::{NotificationError, NotificationSender};
use async_trait::async_trait;
use shared_bus::{CaseEvent, EventPublisher};
use std::sync::Arc;
use tracing::debug;

/// Publishes every lifecycle event to the bus.
///
/// An event with no listeners is not an error; consumers may come and go.
pub struct BusNotificationSender<P: EventPublisher> {
    publisher: Arc<P>,
}

impl<P: EventPublisher> BusNotificationSender<P> {
    pub fn new(publisher: Arc<P>) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &Arc<P> {
        &self.publisher
    }
}

#[async_trait]
impl<P: EventPublisher> NotificationSender for BusNotificationSender<P> {
    async fn notify(&self, event: &CaseEvent) -> Result<(), NotificationError> {
        let receivers = self.publisher.publish(event.clone()).await;
        debug!(
            event = event.name(),
            case_id = %event.case_id(),
            receivers,
            "Lifecycle event published"
        );
        Ok(())
    }
}
