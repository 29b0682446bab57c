//! Single-incident rehearsal
//!
//! Triggers one escalation against a [`TracingGateway`], follows its notices
//! and optionally acknowledges it after a delay. The run ends when the event
//! is resolved, or when the emergency call has been placed and no
//! acknowledgement is scheduled.

use std::sync::Arc;
use std::time::Duration;

use escalation_coordination::{
    CoordinatorConfig, EscalationCoordinator, EscalationError, EscalationNotice, EscalationStage,
    EventBusError, InMemoryGuardianDirectory, NoticeFilter, ResolvedBy,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::gateway::TracingGateway;

/// What to rehearse
#[derive(Debug, Clone)]
pub struct Scenario {
    pub subject_id: String,
    pub alert_kind: String,
    pub measurement_ref: String,
    pub value: String,
    pub guardians: Vec<String>,
    /// Recipients whose deliveries fail
    pub fail_recipients: Vec<String>,
    /// Acknowledge this long after triggering; `None` lets the ladder run out
    pub ack_after: Option<Duration>,
    pub resolved_by: ResolvedBy,
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error("notice stream failed: {0}")]
    Notices(#[from] EventBusError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Someone acknowledged before or after the emergency call
    Acknowledged,
    /// The ladder reached the emergency call unacknowledged
    Escalated,
}

/// Result of a rehearsal, printed as JSON by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub event_id: String,
    pub subject_id: String,
    pub stages: Vec<EscalationStage>,
    pub deliveries: usize,
    pub failed_deliveries: usize,
    pub outcome: Outcome,
}

pub async fn run_scenario(
    config: CoordinatorConfig,
    scenario: Scenario,
) -> Result<ScenarioReport, ScenarioError> {
    let gateway =
        Arc::new(TracingGateway::new().with_unreachable(scenario.fail_recipients.clone()));
    let coordinator = EscalationCoordinator::with_config(
        gateway.clone(),
        InMemoryGuardianDirectory::new().shared(),
        config,
    );
    coordinator
        .set_guardians(&scenario.subject_id, scenario.guardians.clone())
        .await;

    // Subscribe first so the stage-one notice is not missed
    let mut notices = coordinator
        .events()
        .subscribe_filtered(NoticeFilter::new().subject(&scenario.subject_id));

    let event = coordinator
        .trigger(
            &scenario.subject_id,
            &scenario.alert_kind,
            &scenario.measurement_ref,
            &scenario.value,
        )
        .await?;
    info!(event_id = %event.id, "Scenario triggered");

    let ack_timer = async {
        match scenario.ack_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(ack_timer);

    let mut stages = Vec::new();
    let mut acknowledged = false;
    let outcome = loop {
        tokio::select! {
            biased;

            notice = notices.recv() => {
                // A lagging receiver resumes at the oldest retained notice,
                // and the newest one is always retained.
                let notice = match notice {
                    Ok(notice) => notice,
                    Err(EventBusError::Lagged(skipped)) => {
                        warn!(skipped, "Scenario notice stream lagged");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if notice.event_id() != event.id {
                    continue;
                }
                debug!(notice_type = notice.notice_type(), "Scenario notice");
                match notice {
                    EscalationNotice::StageFired { stage, .. } => {
                        stages.push(stage);
                        // A pending acknowledgement still gets its turn
                        let ack_pending = scenario.ack_after.is_some() && !acknowledged;
                        if stage == EscalationStage::EmergencyCall && !ack_pending {
                            break Outcome::Escalated;
                        }
                    }
                    EscalationNotice::Resolved { .. } => break Outcome::Acknowledged,
                    EscalationNotice::Cancelled { .. } => break Outcome::Acknowledged,
                    EscalationNotice::Triggered { .. } => {}
                }
            }

            _ = &mut ack_timer, if !acknowledged => {
                acknowledged = true;
                coordinator.acknowledge(&event.id, scenario.resolved_by).await?;
            }
        }
    };

    coordinator.shutdown().await;

    Ok(ScenarioReport {
        event_id: event.id,
        subject_id: event.subject_id,
        stages,
        deliveries: gateway.sent(),
        failed_deliveries: gateway.failed(),
        outcome,
    })
}
