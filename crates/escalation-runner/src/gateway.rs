//! Gateway that logs every notification instead of sending it.
//!
//! Stands in for the push/SMS/voice senders when running the coordinator
//! locally. Recipients can be marked unreachable to rehearse partial
//! delivery failures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use escalation_coordination::{DeliveryError, Notification, NotificationGateway, Priority};
use tracing::{info, warn};

/// Logging gateway with optional unreachable recipients.
#[derive(Debug, Default)]
pub struct TracingGateway {
    unreachable: HashSet<String>,
    sent: AtomicUsize,
    failed: AtomicUsize,
}

impl TracingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat the given recipients as unreachable.
    pub fn with_unreachable(mut self, recipients: impl IntoIterator<Item = String>) -> Self {
        self.unreachable.extend(recipients);
        self
    }

    /// Successful sends so far.
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }

    /// Rejected sends so far.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NotificationGateway for TracingGateway {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if notification.recipient_id.is_empty() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Err(DeliveryError::Rejected {
                recipient: String::new(),
                reason: "empty recipient".to_string(),
            });
        }

        if self.unreachable.contains(&notification.recipient_id) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Err(DeliveryError::Unavailable(format!(
                "{} unreachable on {}",
                notification.recipient_id, notification.channel
            )));
        }

        match notification.priority {
            Priority::Critical => warn!(
                recipient_id = %notification.recipient_id,
                channel = %notification.channel,
                title = %notification.title,
                "{}",
                notification.body
            ),
            Priority::Urgent => info!(
                recipient_id = %notification.recipient_id,
                channel = %notification.channel,
                title = %notification.title,
                "{}",
                notification.body
            ),
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
