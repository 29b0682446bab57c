//! Escalation Coordinator — Time-boxed alert ladder for health-critical events
//!
//! A detected incident walks a fixed ladder of increasingly intrusive
//! actions until someone acknowledges it. Each event runs on its own task;
//! unrelated events never wait on each other.
//!
//! # Escalation Ladder
//!
//! ```text
//! Trigger
//!     │
//!     ▼
//! InAppAlert ── urgent in-app alert to the subject (synchronous)
//!     │  wait d1
//!     ▼
//! GuardianPush ── push to every guardian, read from the directory at fire time
//!     │  wait d2
//!     ▼
//! AiVoiceCall ── voice confirmation call to the subject
//!     │  wait d3
//!     ▼
//! EmergencyCall ── critical notice to emergency services (no further auto stage)
//!
//! Acknowledge / Cancel from any active stage ──▶ Resolved / Cancelled
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use escalation_coordination::{EscalationCoordinator, InMemoryGuardianDirectory, ResolvedBy};
//!
//! let coordinator = EscalationCoordinator::new(gateway, InMemoryGuardianDirectory::new().shared());
//! coordinator.set_guardians("user-1", vec!["guardian-1".into()]).await;
//!
//! let event = coordinator.trigger("user-1", "health_critical", "m-42", "182 bpm").await?;
//! coordinator.acknowledge(&event.id, ResolvedBy::Subject).await?;
//! ```

pub mod coordinator;
pub mod error;
pub mod event;
pub mod policy;
pub mod stage;

pub use coordinator::{EscalationCoordinator, SharedNotificationGateway, StageReport};
pub use error::{EscalationError, EscalationResult};
pub use event::{EscalationEvent, EventId};
pub use policy::{EscalationPolicy, PolicyFile, STAGE_DELAY_COUNT};
pub use stage::{AlertKind, EscalationStage, Resolution, ResolvedBy};
