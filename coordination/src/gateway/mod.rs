//! Outbound notification boundary
//!
//! The coordinator only formats notifications and hands them to a
//! [`NotificationGateway`]. Real senders (push, SMS, in-app store, voice,
//! emergency dispatch) live behind this trait.

mod recording;

pub use recording::{RecordedDelivery, RecordingGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Push,
    Voice,
    Emergency,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InApp => write!(f, "in_app"),
            Self::Push => write!(f, "push"),
            Self::Voice => write!(f, "voice"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Category tag stored alongside the notification by the delivery service
pub const HEALTH_ALERT_KIND: &str = "health_alert";

/// Recipient ID used for the emergency-services stage
pub const EMERGENCY_SERVICES: &str = "emergency-services";

/// A single formatted notification addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub channel: Channel,
    pub priority: Priority,
    pub kind: String,
    pub title: String,
    pub body: String,
    /// Opaque reference to the triggering measurement
    pub reference: String,
}

/// Error returned by a gateway for a single delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery to {recipient} rejected: {reason}")]
    Rejected { recipient: String, reason: String },

    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort sender for escalation notifications
///
/// Implementations enforce their own timeouts. Errors are logged by the
/// caller and never abort an escalation.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}
