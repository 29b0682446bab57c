//! Lifecycle notices published by the escalation coordinator
//!
//! Notices are the coordinator's only outward record of what happened to an
//! event. Durable audit storage subscribes to them; the coordinator itself
//! keeps nothing once an event leaves the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::{AlertKind, EscalationStage, EventId, ResolvedBy};

/// All escalation lifecycle notices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EscalationNotice {
    /// A new escalation was registered and its first stage fired
    Triggered {
        event_id: EventId,
        subject_id: String,
        alert_kind: AlertKind,
        timestamp: DateTime<Utc>,
    },

    /// A stage fired
    StageFired {
        event_id: EventId,
        subject_id: String,
        stage: EscalationStage,
        /// Delivery attempts made for this stage
        attempted: usize,
        /// Attempts the gateway rejected
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Acknowledged by someone
    Resolved {
        event_id: EventId,
        subject_id: String,
        resolved_by: ResolvedBy,
        /// Last stage that fired before the acknowledgement
        last_stage: EscalationStage,
        timestamp: DateTime<Utc>,
    },

    /// Aborted without acknowledgement
    Cancelled {
        event_id: EventId,
        subject_id: String,
        cancelled_by: Option<ResolvedBy>,
        last_stage: EscalationStage,
        timestamp: DateTime<Utc>,
    },
}

impl EscalationNotice {
    /// Get the timestamp of this notice
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Triggered { timestamp, .. }
            | Self::StageFired { timestamp, .. }
            | Self::Resolved { timestamp, .. }
            | Self::Cancelled { timestamp, .. } => *timestamp,
        }
    }

    /// Get the notice type as a string
    pub fn notice_type(&self) -> &'static str {
        match self {
            Self::Triggered { .. } => "triggered",
            Self::StageFired { .. } => "stage_fired",
            Self::Resolved { .. } => "resolved",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            Self::Triggered { event_id, .. }
            | Self::StageFired { event_id, .. }
            | Self::Resolved { event_id, .. }
            | Self::Cancelled { event_id, .. } => event_id,
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            Self::Triggered { subject_id, .. }
            | Self::StageFired { subject_id, .. }
            | Self::Resolved { subject_id, .. }
            | Self::Cancelled { subject_id, .. } => subject_id,
        }
    }

    /// Whether this notice ends the event's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Cancelled { .. })
    }
}
