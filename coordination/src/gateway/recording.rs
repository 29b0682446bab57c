//! In-memory gateway that records every delivery attempt
//!
//! Used by tests and dry runs. Recipients can be marked as failing to
//! exercise the best-effort paths.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Channel, DeliveryError, Notification, NotificationGateway};

/// A delivery attempt together with when it happened
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub notification: Notification,
    /// Tokio clock reading, so paused-time tests can compare offsets exactly
    pub at: Instant,
    pub succeeded: bool,
}

#[derive(Default)]
struct RecordingState {
    deliveries: Vec<RecordedDelivery>,
    failing: HashSet<String>,
}

/// Gateway double that keeps every attempt in memory
#[derive(Clone, Default)]
pub struct RecordingGateway {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `recipient_id` fail from now on
    pub fn fail_recipient(&self, recipient_id: impl Into<String>) {
        self.lock().failing.insert(recipient_id.into());
    }

    /// All attempts, successful or not, in the order they were made
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.lock().deliveries.clone()
    }

    /// Attempts whose reference matches `reference`
    pub fn deliveries_for_reference(&self, reference: &str) -> Vec<RecordedDelivery> {
        self.lock()
            .deliveries
            .iter()
            .filter(|d| d.notification.reference == reference)
            .cloned()
            .collect()
    }

    /// Attempts on a given channel
    pub fn on_channel(&self, channel: Channel) -> Vec<RecordedDelivery> {
        self.lock()
            .deliveries
            .iter()
            .filter(|d| d.notification.channel == channel)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.lock().deliveries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut state = self.lock();
        let failing = state.failing.contains(&notification.recipient_id);
        state.deliveries.push(RecordedDelivery {
            notification: notification.clone(),
            at: Instant::now(),
            succeeded: !failing,
        });

        if failing {
            return Err(DeliveryError::Rejected {
                recipient: notification.recipient_id.clone(),
                reason: "recipient marked as failing".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Priority;

    fn note(recipient: &str, channel: Channel) -> Notification {
        Notification {
            recipient_id: recipient.to_string(),
            channel,
            priority: Priority::Urgent,
            kind: "health_alert".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            reference: "m-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_records_attempts_in_order() {
        let gateway = RecordingGateway::new();
        gateway.send(&note("a", Channel::InApp)).await.unwrap();
        gateway.send(&note("b", Channel::Push)).await.unwrap();

        let deliveries = gateway.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].notification.recipient_id, "a");
        assert_eq!(gateway.on_channel(Channel::Push).len(), 1);
        assert_eq!(gateway.deliveries_for_reference("m-1").len(), 2);
    }

    #[tokio::test]
    async fn test_failing_recipient_is_recorded_and_rejected() {
        let gateway = RecordingGateway::new();
        gateway.fail_recipient("b");

        assert!(gateway.send(&note("b", Channel::Push)).await.is_err());
        assert!(gateway.send(&note("c", Channel::Push)).await.is_ok());

        let deliveries = gateway.deliveries();
        assert!(!deliveries[0].succeeded);
        assert!(deliveries[1].succeeded);
    }
}
