//! Escalation stages and resolution markers
//!
//! The active stages form a fixed forward ladder. `Resolved` and `Cancelled`
//! sit beside the ladder and are reachable from any active stage.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::EscalationError;

/// Position of an event in the escalation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStage {
    /// Urgent in-app alert to the subject (fired synchronously on trigger)
    InAppAlert,
    /// Push alert fanned out to every guardian of the subject
    GuardianPush,
    /// Outbound voice-confirmation call to the subject
    AiVoiceCall,
    /// Emergency-services notification; last automatic stage
    EmergencyCall,
    /// Acknowledged by the subject, a guardian or an operator
    Resolved,
    /// Aborted without acknowledgement (operator cancel or shutdown)
    Cancelled,
}

impl EscalationStage {
    /// Active stages in firing order
    pub const LADDER: [EscalationStage; 4] = [
        Self::InAppAlert,
        Self::GuardianPush,
        Self::AiVoiceCall,
        Self::EmergencyCall,
    ];

    /// The next automatic stage, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::InAppAlert => Some(Self::GuardianPush),
            Self::GuardianPush => Some(Self::AiVoiceCall),
            Self::AiVoiceCall => Some(Self::EmergencyCall),
            Self::EmergencyCall | Self::Resolved | Self::Cancelled => None,
        }
    }

    /// Zero-based position on the ladder (`None` for terminal states)
    pub fn ordinal(&self) -> Option<usize> {
        Self::LADDER.iter().position(|s| s == self)
    }

    /// Whether the event has left the ladder for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

impl std::fmt::Display for EscalationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InAppAlert => write!(f, "in_app_alert"),
            Self::GuardianPush => write!(f, "guardian_push"),
            Self::AiVoiceCall => write!(f, "ai_voice_call"),
            Self::EmergencyCall => write!(f, "emergency_call"),
            Self::Resolved => write!(f, "resolved"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Cause of an escalation, classified upstream
///
/// Serialized as its bare string, known or not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlertKind {
    HealthCritical,
    FallDetected,
    NoResponse,
    /// Any other upstream classification, kept verbatim
    Other(String),
}

impl AlertKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::HealthCritical => "health_critical",
            Self::FallDetected => "fall_detected",
            Self::NoResponse => "no_response",
            Self::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for AlertKind {
    type Error = EscalationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for AlertKind {
    type Err = EscalationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(EscalationError::InvalidInput(
                "alert kind must not be empty".to_string(),
            )),
            "health_critical" => Ok(Self::HealthCritical),
            "fall_detected" => Ok(Self::FallDetected),
            "no_response" => Ok(Self::NoResponse),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

/// How an event left the active ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    None,
    Resolved,
    Cancelled,
}

/// Who stopped an escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Subject,
    Guardian,
    Operator,
}

impl ResolvedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Guardian => "guardian",
            Self::Operator => "operator",
        }
    }
}

impl std::fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolvedBy {
    type Err = EscalationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // "user" is what the measurement clients send
            "subject" | "user" => Ok(Self::Subject),
            "guardian" => Ok(Self::Guardian),
            "operator" => Ok(Self::Operator),
            other => Err(EscalationError::InvalidInput(format!(
                "unknown resolver: {:?}",
                other
            ))),
        }
    }
}
