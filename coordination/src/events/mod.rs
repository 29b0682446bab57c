//! Escalation lifecycle notices
//!
//! The coordinator publishes a notice for every trigger, stage fire and
//! resolution. Anything that needs a durable history (audit log, analytics)
//! subscribes here instead of reaching into the coordinator's registry.
//!
//! # Notice Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Coordinator  │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use escalation_coordination::events::{EventBus, NoticeFilter};
//!
//! let bus = EventBus::new().shared();
//! let mut receiver = bus.subscribe_filtered(NoticeFilter::new().subject("user-1"));
//!
//! let notice = receiver.recv().await?;
//! println!("{} {}", notice.notice_type(), notice.event_id());
//! ```

pub mod bus;
pub mod types;

pub use bus::{
    EventBus, EventBusError, EventBusResult, NoticeFilter, NoticeReceiver, SharedEventBus,
    DEFAULT_CHANNEL_CAPACITY,
};
pub use types::EscalationNotice;
