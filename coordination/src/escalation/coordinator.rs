//! Escalation coordinator - owns in-flight escalations and their stage chains
//!
//! Every triggered event gets a slot holding its record behind an async mutex
//! and a cancellation token. One task per event waits out each policy delay
//! racing against that token, then fires the next stage while holding the
//! event lock. Acknowledgement resolves the record under the same lock, so a
//! stage either completes before an acknowledgement is accepted or never
//! fires at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::{EscalationError, EscalationResult};
use super::event::{EscalationEvent, EventId};
use super::policy::EscalationPolicy;
use super::stage::{AlertKind, EscalationStage, Resolution, ResolvedBy};
use crate::config::CoordinatorConfig;
use crate::directory::SharedGuardianDirectory;
use crate::events::{EscalationNotice, EventBus, SharedEventBus};
use crate::gateway::{
    Channel, Notification, NotificationGateway, Priority, EMERGENCY_SERVICES, HEALTH_ALERT_KIND,
};

/// Shared reference to a notification gateway
pub type SharedNotificationGateway = Arc<dyn NotificationGateway>;

/// Delivery tally for one stage fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageReport {
    pub attempted: usize,
    pub failed: usize,
}

/// Live state of one in-flight escalation
struct EventSlot {
    subject_id: String,
    event: tokio::sync::Mutex<EscalationEvent>,
    cancel: CancellationToken,
}

struct Inner {
    gateway: SharedNotificationGateway,
    directory: SharedGuardianDirectory,
    bus: SharedEventBus,
    policy: RwLock<Arc<EscalationPolicy>>,
    active: Mutex<HashMap<EventId, Arc<EventSlot>>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

/// Drives time-boxed escalation chains for health-critical events
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct EscalationCoordinator {
    inner: Arc<Inner>,
}

impl EscalationCoordinator {
    /// Create a coordinator with the default policy and its own notice bus
    pub fn new(gateway: SharedNotificationGateway, directory: SharedGuardianDirectory) -> Self {
        Self::with_config(gateway, directory, CoordinatorConfig::default())
    }

    /// Create a coordinator from configuration
    pub fn with_config(
        gateway: SharedNotificationGateway,
        directory: SharedGuardianDirectory,
        config: CoordinatorConfig,
    ) -> Self {
        let bus = EventBus::with_capacity(config.notice_capacity).shared();
        Self::with_bus(gateway, directory, config.policy, bus)
    }

    /// Create a coordinator publishing to an existing notice bus
    pub fn with_bus(
        gateway: SharedNotificationGateway,
        directory: SharedGuardianDirectory,
        policy: EscalationPolicy,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                directory,
                bus,
                policy: RwLock::new(Arc::new(policy)),
                active: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Notice bus this coordinator publishes to
    pub fn events(&self) -> SharedEventBus {
        self.inner.bus.clone()
    }

    // =========================================================================
    // Trigger / Acknowledge
    // =========================================================================

    /// Start an escalation for `subject_id`
    ///
    /// The in-app alert to the subject is attempted before this returns; the
    /// remaining stages run on a background task.
    pub async fn trigger(
        &self,
        subject_id: &str,
        alert_kind: &str,
        measurement_ref: &str,
        value: &str,
    ) -> EscalationResult<EscalationEvent> {
        // Ids are opaque; whitespace-only counts as missing
        if subject_id.trim().is_empty() {
            return Err(EscalationError::InvalidInput(
                "subject id must not be empty".to_string(),
            ));
        }
        let alert_kind: AlertKind = alert_kind.parse()?;

        let policy = self.policy_snapshot();
        let event = EscalationEvent::new(subject_id, alert_kind, measurement_ref, value);
        let event_id = event.id.clone();
        let slot = Arc::new(EventSlot {
            subject_id: subject_id.to_string(),
            event: tokio::sync::Mutex::new(event),
            cancel: self.inner.shutdown.child_token(),
        });

        // Hold the event lock until stage 1 is done so nothing can resolve
        // the event halfway through its first delivery.
        let event = slot.event.lock().await;
        {
            let mut active = self.inner.registry();
            if self.inner.shutdown.is_cancelled() {
                return Err(EscalationError::InvalidInput(
                    "coordinator is shutting down".to_string(),
                ));
            }
            active.insert(event_id.clone(), slot.clone());
        }

        info!(
            event_id = %event.id,
            subject_id = %event.subject_id,
            alert_kind = %event.alert_kind,
            value = %event.value,
            "Escalation triggered"
        );
        self.inner.bus.publish(EscalationNotice::Triggered {
            event_id: event.id.clone(),
            subject_id: event.subject_id.clone(),
            alert_kind: event.alert_kind.clone(),
            timestamp: event.created_at,
        });

        let report = self.inner.fire_stage(&event).await;
        self.inner.publish_stage(&event, report);
        let snapshot = event.clone();
        drop(event);

        if !slot.cancel.is_cancelled() {
            let span = info_span!("escalation_chain", event_id = %event_id);
            self.inner
                .tasks
                .spawn(run_chain(self.inner.clone(), slot, policy).instrument(span));
        }

        Ok(snapshot)
    }

    /// Stop an escalation because someone confirmed they are handling it
    ///
    /// Fails with `NotFound` for unknown IDs and for events that are no longer
    /// active, including ones acknowledged earlier.
    pub async fn acknowledge(
        &self,
        event_id: &str,
        resolved_by: ResolvedBy,
    ) -> EscalationResult<EscalationEvent> {
        self.finish(event_id, Resolution::Resolved, Some(resolved_by))
            .await
    }

    /// Abort an escalation without acknowledgement (e.g. a false alarm)
    pub async fn cancel(
        &self,
        event_id: &str,
        cancelled_by: ResolvedBy,
    ) -> EscalationResult<EscalationEvent> {
        self.finish(event_id, Resolution::Cancelled, Some(cancelled_by))
            .await
    }

    async fn finish(
        &self,
        event_id: &str,
        resolution: Resolution,
        by: Option<ResolvedBy>,
    ) -> EscalationResult<EscalationEvent> {
        let slot = self
            .inner
            .registry()
            .get(event_id)
            .cloned()
            .ok_or_else(|| EscalationError::NotFound(event_id.to_string()))?;

        let mut event = slot.event.lock().await;
        let last_stage = event.stage;
        if !event.resolve(resolution, by) {
            // Lost the race against another acknowledgement or shutdown
            return Err(EscalationError::NotFound(event_id.to_string()));
        }
        slot.cancel.cancel();
        self.inner.registry().remove(event_id);
        let snapshot = event.clone();
        drop(event);

        self.inner.publish_terminal(&snapshot, last_stage);
        Ok(snapshot)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Copies of every active escalation for `subject_id`, oldest first
    pub async fn active_escalations_for(&self, subject_id: &str) -> Vec<EscalationEvent> {
        let slots: Vec<Arc<EventSlot>> = self
            .inner
            .registry()
            .values()
            .filter(|slot| slot.subject_id == subject_id)
            .cloned()
            .collect();

        let mut events = Vec::with_capacity(slots.len());
        for slot in slots {
            let event = slot.event.lock().await;
            if event.is_active() {
                events.push(event.clone());
            }
        }
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        events
    }

    /// Copy of a single active escalation
    pub async fn event(&self, event_id: &str) -> Option<EscalationEvent> {
        let slot = self.inner.registry().get(event_id).cloned()?;
        let event = slot.event.lock().await;
        event.is_active().then(|| event.clone())
    }

    /// Number of escalations currently in flight
    pub fn active_count(&self) -> usize {
        self.inner.registry().len()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the guardians notified for `subject_id`
    ///
    /// Takes effect for every guardian-push stage fired afterwards, including
    /// those of escalations already running.
    pub async fn set_guardians(&self, subject_id: &str, guardian_ids: Vec<String>) {
        debug!(subject_id, count = guardian_ids.len(), "Guardians updated");
        self.inner
            .directory
            .set_guardians(subject_id, guardian_ids)
            .await;
    }

    /// Replace the policy used by escalations triggered from now on
    pub fn set_policy(&self, policy: EscalationPolicy) {
        info!(delays = ?policy.delays(), "Escalation policy replaced");
        let mut current = self
            .inner
            .policy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(policy);
    }

    /// The policy new escalations will use
    pub fn policy(&self) -> EscalationPolicy {
        self.policy_snapshot().as_ref().clone()
    }

    fn policy_snapshot(&self) -> Arc<EscalationPolicy> {
        self.inner
            .policy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Cancel every in-flight escalation and wait for their tasks to exit
    ///
    /// Triggers made after this starts fail with `InvalidInput`.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let slots: Vec<Arc<EventSlot>> = self
            .inner
            .registry()
            .drain()
            .map(|(_, slot)| slot)
            .collect();

        let cancelled = slots.len();
        for slot in slots {
            let mut event = slot.event.lock().await;
            let last_stage = event.stage;
            if event.resolve(Resolution::Cancelled, None) {
                let snapshot = event.clone();
                drop(event);
                self.inner.publish_terminal(&snapshot, last_stage);
            }
        }

        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        info!(cancelled, "Escalation coordinator shut down");
    }
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, HashMap<EventId, Arc<EventSlot>>> {
        // The map stays consistent even if a holder panicked
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run the action bound to the event's current stage
    async fn fire_stage(&self, event: &EscalationEvent) -> StageReport {
        let kind = event.alert_kind.as_str();
        match event.stage {
            EscalationStage::InAppAlert => {
                let note = self.notification(
                    event,
                    &event.subject_id,
                    Channel::InApp,
                    Priority::Urgent,
                    "Health alert detected",
                    format!(
                        "[URGENT] Your {} reading is in the danger range: {}. Please check in now.",
                        kind, event.value
                    ),
                );
                self.deliver_all(event, vec![note]).await
            }
            EscalationStage::GuardianPush => {
                let guardians = self.directory.guardians_of(&event.subject_id).await;
                if guardians.is_empty() {
                    info!(
                        event_id = %event.id,
                        subject_id = %event.subject_id,
                        "No guardians to notify"
                    );
                }
                let notes = guardians
                    .iter()
                    .map(|guardian_id| {
                        self.notification(
                            event,
                            guardian_id,
                            Channel::Push,
                            Priority::Urgent,
                            "Family health emergency",
                            format!(
                                "A family member's {} reading is critical: {}. They have not responded.",
                                kind, event.value
                            ),
                        )
                    })
                    .collect();
                self.deliver_all(event, notes).await
            }
            EscalationStage::AiVoiceCall => {
                info!(
                    event_id = %event.id,
                    subject_id = %event.subject_id,
                    "Placing voice confirmation call"
                );
                let note = self.notification(
                    event,
                    &event.subject_id,
                    Channel::Voice,
                    Priority::Urgent,
                    "Voice check-in",
                    format!(
                        "Automated call: your {} reading was {}. Press 1 if you are safe.",
                        kind, event.value
                    ),
                );
                self.deliver_all(event, vec![note]).await
            }
            EscalationStage::EmergencyCall => {
                warn!(
                    event_id = %event.id,
                    subject_id = %event.subject_id,
                    alert_kind = %event.alert_kind,
                    value = %event.value,
                    "Notifying emergency services"
                );
                let note = self.notification(
                    event,
                    EMERGENCY_SERVICES,
                    Channel::Emergency,
                    Priority::Critical,
                    "Emergency dispatch request",
                    format!(
                        "Unacknowledged {} alert for subject {}: {}. No response for {}s.",
                        kind,
                        event.subject_id,
                        event.value,
                        (Utc::now() - event.created_at).num_seconds()
                    ),
                );
                self.deliver_all(event, vec![note]).await
            }
            EscalationStage::Resolved | EscalationStage::Cancelled => StageReport::default(),
        }
    }

    fn notification(
        &self,
        event: &EscalationEvent,
        recipient_id: &str,
        channel: Channel,
        priority: Priority,
        title: &str,
        body: String,
    ) -> Notification {
        Notification {
            recipient_id: recipient_id.to_string(),
            channel,
            priority,
            kind: HEALTH_ALERT_KIND.to_string(),
            title: title.to_string(),
            body,
            reference: event.measurement_ref.clone(),
        }
    }

    /// Send every notification independently; failures are logged only
    async fn deliver_all(&self, event: &EscalationEvent, notes: Vec<Notification>) -> StageReport {
        let attempts = notes.iter().map(|note| async move {
            match self.gateway.send(note).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        stage = %event.stage,
                        recipient_id = %note.recipient_id,
                        channel = %note.channel,
                        "Delivery failed: {}",
                        e
                    );
                    false
                }
            }
        });
        let results = join_all(attempts).await;
        StageReport {
            attempted: results.len(),
            failed: results.iter().filter(|ok| !**ok).count(),
        }
    }

    fn publish_stage(&self, event: &EscalationEvent, report: StageReport) {
        self.bus.publish(EscalationNotice::StageFired {
            event_id: event.id.clone(),
            subject_id: event.subject_id.clone(),
            stage: event.stage,
            attempted: report.attempted,
            failed: report.failed,
            timestamp: event.last_transition_at,
        });
    }

    fn publish_terminal(&self, event: &EscalationEvent, last_stage: EscalationStage) {
        let timestamp = event.resolved_at.unwrap_or(event.last_transition_at);
        match (event.resolution, event.resolved_by) {
            (Resolution::Resolved, Some(resolved_by)) => {
                info!(
                    event_id = %event.id,
                    subject_id = %event.subject_id,
                    resolved_by = %resolved_by,
                    last_stage = %last_stage,
                    "Escalation acknowledged"
                );
                self.bus.publish(EscalationNotice::Resolved {
                    event_id: event.id.clone(),
                    subject_id: event.subject_id.clone(),
                    resolved_by,
                    last_stage,
                    timestamp,
                });
            }
            (_, cancelled_by) => {
                info!(
                    event_id = %event.id,
                    subject_id = %event.subject_id,
                    cancelled_by = ?cancelled_by,
                    last_stage = %last_stage,
                    "Escalation cancelled"
                );
                self.bus.publish(EscalationNotice::Cancelled {
                    event_id: event.id.clone(),
                    subject_id: event.subject_id.clone(),
                    cancelled_by,
                    last_stage,
                    timestamp,
                });
            }
        }
    }
}

/// Per-event stage chain
///
/// Exits as soon as the event's token is cancelled, or after the emergency
/// stage fires. The event stays registered after that until acknowledged.
async fn run_chain(inner: Arc<Inner>, slot: Arc<EventSlot>, policy: Arc<EscalationPolicy>) {
    let mut stage = EscalationStage::InAppAlert;

    while let Some(next) = stage.next() {
        let delay = policy.delay_before(next).unwrap_or_default();
        tokio::select! {
            biased;
            _ = slot.cancel.cancelled() => {
                debug!(stage = %stage, "Escalation chain cancelled while waiting");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let mut event = slot.event.lock().await;
        if slot.cancel.is_cancelled() || !event.is_active() {
            debug!(stage = %event.stage, "Escalation resolved before next stage");
            return;
        }
        if event.advance() != Some(next) {
            return;
        }

        info!(
            event_id = %event.id,
            subject_id = %event.subject_id,
            stage = %next,
            "Escalation advanced"
        );
        let report = inner.fire_stage(&event).await;
        inner.publish_stage(&event, report);
        stage = next;
    }

    debug!("Escalation chain reached its last stage");
}
