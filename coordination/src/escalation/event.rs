//! Escalation event record
//!
//! One record per triggered incident. The coordinator owns the live copy;
//! everything handed to callers is a clone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::{AlertKind, EscalationStage, Resolution, ResolvedBy};

/// Identifier of an escalation event
pub type EventId = String;

/// A single escalation incident and its position on the ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    /// Unique ID, assigned at creation
    pub id: EventId,
    /// Monitored user the incident is about
    pub subject_id: String,
    /// Upstream classification of the incident
    pub alert_kind: AlertKind,
    /// Current stage
    pub stage: EscalationStage,
    /// Opaque pointer to the triggering measurement
    pub measurement_ref: String,
    /// Opaque rendering of the triggering value
    pub value: String,
    pub created_at: DateTime<Utc>,
    /// Updated on every stage change, including resolution
    pub last_transition_at: DateTime<Utc>,
    pub resolution: Resolution,
    /// `None` until resolved; also `None` for shutdown cancellations
    pub resolved_by: Option<ResolvedBy>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscalationEvent {
    /// Create a new event sitting on the first stage
    pub fn new(
        subject_id: impl Into<String>,
        alert_kind: AlertKind,
        measurement_ref: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::new_id(),
            subject_id: subject_id.into(),
            alert_kind,
            stage: EscalationStage::InAppAlert,
            measurement_ref: measurement_ref.into(),
            value: value.into(),
            created_at: now,
            last_transition_at: now,
            resolution: Resolution::None,
            resolved_by: None,
            resolved_at: None,
        }
    }

    /// Generate a fresh event ID
    pub fn new_id() -> EventId {
        format!("esc-{}", Uuid::new_v4())
    }

    /// Whether the event still accepts transitions
    pub fn is_active(&self) -> bool {
        self.resolution == Resolution::None
    }

    /// Move to the next ladder stage
    ///
    /// Returns the new stage, or `None` when the event is resolved or already
    /// on the last automatic stage. Never moves backwards.
    pub fn advance(&mut self) -> Option<EscalationStage> {
        if !self.is_active() {
            return None;
        }
        let next = self.stage.next()?;
        self.stage = next;
        self.last_transition_at = Utc::now();
        Some(next)
    }

    /// Stamp the resolution; only the first call has any effect
    ///
    /// Returns `false` when the event was already resolved.
    pub fn resolve(&mut self, resolution: Resolution, by: Option<ResolvedBy>) -> bool {
        if !self.is_active() {
            return false;
        }
        let stage = match resolution {
            Resolution::Resolved => EscalationStage::Resolved,
            Resolution::Cancelled => EscalationStage::Cancelled,
            Resolution::None => return false,
        };
        let now = Utc::now();
        self.stage = stage;
        self.resolution = resolution;
        self.resolved_by = by;
        self.resolved_at = Some(now);
        self.last_transition_at = now;
        true
    }
}
