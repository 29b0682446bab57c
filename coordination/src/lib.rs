//! Emergency Escalation Coordination Library
//!
//! This library provides:
//! - The escalation coordinator that drives a time-boxed, multi-stage alert
//!   ladder for health-critical events until someone acknowledges it
//! - Boundary traits for the notification gateway and guardian directory
//! - A bounded notice bus publishing every escalation lifecycle change
//!
//! # Features
//!
//! ## Coordinator operations
//! - `trigger`: start an escalation (stage 1 fires before it returns)
//! - `acknowledge` / `cancel`: stop an escalation at any active stage
//! - `active_escalations_for` / `event`: read-only snapshots
//! - `set_guardians` / `set_policy`: runtime configuration
//! - `shutdown`: cancel everything and wait for stage tasks to exit
//!
//! ## Collaborators
//! - `NotificationGateway`: best-effort sender, one call per recipient
//! - `GuardianDirectory`: subject → guardians, read when guardians are paged
//! - `EventBus`: lifecycle notices for audit or analytics subscribers

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod directory;
pub mod escalation;
pub mod events;
pub mod gateway;

// Re-export key escalation types
pub use escalation::{
    AlertKind, EscalationCoordinator, EscalationError, EscalationEvent, EscalationPolicy,
    EscalationResult, EscalationStage, EventId, Resolution, ResolvedBy, SharedNotificationGateway,
    StageReport,
};

// Re-export configuration types
pub use config::{ConfigError, CoordinatorConfig};

// Re-export collaborator types
pub use directory::{GuardianDirectory, InMemoryGuardianDirectory, SharedGuardianDirectory};
pub use gateway::{
    Channel, DeliveryError, Notification, NotificationGateway, Priority, RecordedDelivery,
    RecordingGateway,
};

// Re-export notice types
pub use events::{
    EscalationNotice, EventBus, EventBusError, NoticeFilter, NoticeReceiver, SharedEventBus,
};
