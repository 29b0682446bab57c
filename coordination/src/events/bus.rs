//! Notice bus for escalation lifecycle events
//!
//! Tokio broadcast-based pub/sub. The channel is bounded; a subscriber that
//! falls behind loses the oldest notices instead of slowing escalations down.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::EscalationNotice;

/// Default channel capacity for broadcast
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Error type for event bus operations
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Subscriber lagged, {0} notices dropped")]
    Lagged(u64),
}

/// Result type for event bus operations
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Event bus with a bounded broadcast channel
pub struct EventBus {
    sender: broadcast::Sender<EscalationNotice>,
}

impl EventBus {
    /// Create a new event bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an event bus holding at most `capacity` undelivered notices
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish a notice to all subscribers
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, notice: EscalationNotice) -> usize {
        let notice_type = notice.notice_type();
        match self.sender.send(notice) {
            Ok(count) => {
                debug!(notice_type, receivers = count, "Notice published");
                count
            }
            Err(_) => {
                debug!(notice_type, "Notice published (no receivers)");
                0
            }
        }
    }

    /// Subscribe to receive notices
    pub fn subscribe(&self) -> NoticeReceiver {
        NoticeReceiver {
            receiver: self.sender.subscribe(),
            filter: NoticeFilter::new(),
        }
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered(&self, filter: NoticeFilter) -> NoticeReceiver {
        NoticeReceiver {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Notice filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct NoticeFilter {
    /// Filter by subject
    pub subject_id: Option<String>,
    /// Filter by event
    pub event_id: Option<String>,
    /// Filter by notice types
    pub notice_types: Option<Vec<String>>,
}

impl NoticeFilter {
    /// Create a new empty filter (matches all notices)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject_id: &str) -> Self {
        self.subject_id = Some(subject_id.to_string());
        self
    }

    pub fn event(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn types(mut self, notice_types: Vec<&str>) -> Self {
        self.notice_types = Some(notice_types.into_iter().map(String::from).collect());
        self
    }

    /// Check if a notice matches this filter
    pub fn matches(&self, notice: &EscalationNotice) -> bool {
        if let Some(ref sid) = self.subject_id {
            if notice.subject_id() != sid {
                return false;
            }
        }

        if let Some(ref eid) = self.event_id {
            if notice.event_id() != eid {
                return false;
            }
        }

        if let Some(ref types) = self.notice_types {
            if !types.iter().any(|t| t == notice.notice_type()) {
                return false;
            }
        }

        true
    }
}

/// Receiver that only yields notices matching its filter
pub struct NoticeReceiver {
    receiver: broadcast::Receiver<EscalationNotice>,
    filter: NoticeFilter,
}

impl NoticeReceiver {
    /// Receive the next matching notice
    pub async fn recv(&mut self) -> EventBusResult<EscalationNotice> {
        loop {
            let notice = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::ChannelClosed,
                broadcast::error::RecvError::Lagged(n) => EventBusError::Lagged(n),
            })?;
            if self.filter.matches(&notice) {
                return Ok(notice);
            }
        }
    }

    /// Drain every matching notice that is already buffered
    pub fn drain(&mut self) -> Vec<EscalationNotice> {
        let mut notices = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => {
                    if self.filter.matches(&notice) {
                        notices.push(notice);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::{AlertKind, EscalationStage, ResolvedBy};
    use chrono::Utc;

    fn triggered(event_id: &str, subject_id: &str) -> EscalationNotice {
        EscalationNotice::Triggered {
            event_id: event_id.to_string(),
            subject_id: subject_id.to_string(),
            alert_kind: AlertKind::FallDetected,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        assert_eq!(bus.publish(triggered("esc-1", "user-1")), 1);

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.notice_type(), "triggered");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new().shared();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(triggered("esc-1", "user-1")), 0);
    }

    #[test]
    fn test_notice_filter() {
        let filter = NoticeFilter::new()
            .subject("user-1")
            .types(vec!["triggered", "resolved"]);

        let matching = triggered("esc-1", "user-1");
        let other_subject = triggered("esc-2", "user-2");
        let other_type = EscalationNotice::StageFired {
            event_id: "esc-1".to_string(),
            subject_id: "user-1".to_string(),
            stage: EscalationStage::GuardianPush,
            attempted: 1,
            failed: 0,
            timestamp: Utc::now(),
        };

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other_subject));
        assert!(!filter.matches(&other_type));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let bus = EventBus::new();
        let mut filtered = bus.subscribe_filtered(NoticeFilter::new().event("target"));

        bus.publish(triggered("other", "user-1"));
        bus.publish(EscalationNotice::Resolved {
            event_id: "target".to_string(),
            subject_id: "user-1".to_string(),
            resolved_by: ResolvedBy::Subject,
            last_stage: EscalationStage::InAppAlert,
            timestamp: Utc::now(),
        });

        let notice = filtered.recv().await.unwrap();
        assert_eq!(notice.event_id(), "target");
    }

    #[tokio::test]
    async fn test_lagging_receiver_reports_loss() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();
        for i in 0..5 {
            bus.publish(triggered(&format!("esc-{}", i), "user-1"));
        }
        assert!(matches!(
            receiver.recv().await,
            Err(EventBusError::Lagged(3))
        ));
        assert_eq!(receiver.drain().len(), 2);
    }
}
