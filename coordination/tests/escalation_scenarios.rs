//! End-to-end escalation scenarios on a paused clock.
//!
//! Each test drives the public coordinator API with a recording gateway and
//! an in-memory guardian directory, then checks exactly which deliveries
//! happened and when.

use std::sync::Arc;
use std::time::Duration;

use escalation_coordination::{
    Channel, CoordinatorConfig, EscalationCoordinator, EscalationError, EscalationNotice,
    EscalationPolicy, EscalationStage, InMemoryGuardianDirectory, NoticeFilter, Priority,
    RecordingGateway, ResolvedBy,
};
use tokio::time::Instant;

fn coordinator_with(delays_secs: [f64; 3]) -> (EscalationCoordinator, RecordingGateway) {
    let gateway = RecordingGateway::new();
    let config = CoordinatorConfig {
        policy: EscalationPolicy::from_secs_f64(&delays_secs).unwrap(),
        ..CoordinatorConfig::default()
    };
    let coordinator = EscalationCoordinator::with_config(
        Arc::new(gateway.clone()),
        InMemoryGuardianDirectory::new().shared(),
        config,
    );
    (coordinator, gateway)
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_event_walks_the_full_ladder() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    coordinator
        .set_guardians("user-1", vec!["g-1".into(), "g-2".into()])
        .await;

    let start = Instant::now();
    coordinator
        .trigger("user-1", "health_critical", "m-1", "SpO2 82%")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let deliveries = gateway.deliveries();
    let channels: Vec<Channel> = deliveries.iter().map(|d| d.notification.channel).collect();
    assert_eq!(
        channels,
        vec![
            Channel::InApp,
            Channel::Push,
            Channel::Push,
            Channel::Voice,
            Channel::Emergency
        ]
    );

    let mut push_recipients: Vec<_> = gateway
        .on_channel(Channel::Push)
        .into_iter()
        .map(|d| d.notification.recipient_id)
        .collect();
    push_recipients.sort();
    assert_eq!(push_recipients, vec!["g-1", "g-2"]);

    let emergency = &gateway.on_channel(Channel::Emergency)[0];
    assert_eq!(emergency.notification.priority, Priority::Critical);
    assert_eq!(emergency.at - start, Duration::from_secs(3));
    assert!(emergency.notification.body.contains("health_critical"));
    assert!(emergency.notification.body.contains("SpO2 82%"));

    // Nothing fires twice, even well past the last stage
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(gateway.count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_acknowledgement_leaves_only_stage_one() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    coordinator.set_guardians("user-1", vec!["g-1".into()]).await;

    let event = coordinator
        .trigger("user-1", "health_critical", "m-1", "40 bpm")
        .await
        .unwrap();
    coordinator
        .acknowledge(&event.id, ResolvedBy::Subject)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(gateway.count(), 1);
    assert_eq!(gateway.deliveries()[0].notification.channel, Channel::InApp);

    let err = coordinator
        .acknowledge(&event.id, ResolvedBy::Subject)
        .await
        .unwrap_err();
    assert!(matches!(err, EscalationError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_empty_guardian_list_still_reaches_voice_call() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 60.0]);
    let mut notices = coordinator
        .events()
        .subscribe_filtered(NoticeFilter::new().types(vec!["stage_fired"]));

    let event = coordinator
        .trigger("user-1", "no_response", "m-1", "-")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert!(gateway.on_channel(Channel::Push).is_empty());
    assert_eq!(gateway.on_channel(Channel::Voice).len(), 1);

    let current = coordinator.event(&event.id).await.unwrap();
    assert_eq!(current.stage, EscalationStage::AiVoiceCall);

    let fired: Vec<(EscalationStage, usize)> = notices
        .drain()
        .into_iter()
        .filter_map(|n| match n {
            EscalationNotice::StageFired {
                stage, attempted, ..
            } => Some((stage, attempted)),
            _ => None,
        })
        .collect();
    assert_eq!(
        fired,
        vec![
            (EscalationStage::InAppAlert, 1),
            (EscalationStage::GuardianPush, 0),
            (EscalationStage::AiVoiceCall, 1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_guardian_does_not_block_the_others() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    coordinator
        .set_guardians("user-1", vec!["g-bad".into(), "g-good".into()])
        .await;
    gateway.fail_recipient("g-bad");
    let mut notices = coordinator.events().subscribe();

    coordinator
        .trigger("user-1", "fall_detected", "m-1", "impact")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let pushes = gateway.on_channel(Channel::Push);
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes.iter().filter(|d| d.succeeded).count(), 1);
    assert_eq!(gateway.on_channel(Channel::Emergency).len(), 1);

    let push_notice = notices
        .drain()
        .into_iter()
        .find(|n| {
            matches!(
                n,
                EscalationNotice::StageFired {
                    stage: EscalationStage::GuardianPush,
                    ..
                }
            )
        })
        .unwrap();
    assert!(matches!(
        push_notice,
        EscalationNotice::StageFired {
            attempted: 2,
            failed: 1,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failing_subject_channel_still_escalates() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    gateway.fail_recipient("user-1");

    let event = coordinator
        .trigger("user-1", "health_critical", "m-1", "1")
        .await
        .unwrap();
    assert_eq!(event.stage, EscalationStage::InAppAlert);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(gateway.on_channel(Channel::Emergency).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_directory_changes_reach_in_flight_events() {
    let (coordinator, gateway) = coordinator_with([10.0, 10.0, 10.0]);
    coordinator.set_guardians("user-1", vec!["g-old".into()]).await;

    coordinator
        .trigger("user-1", "health_critical", "m-1", "1")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    coordinator.set_guardians("user-1", vec!["g-new".into()]).await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    let recipients: Vec<_> = gateway
        .on_channel(Channel::Push)
        .into_iter()
        .map(|d| d.notification.recipient_id)
        .collect();
    assert_eq!(recipients, vec!["g-new"]);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledgement_after_emergency_call_resolves() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    let event = coordinator
        .trigger("user-1", "health_critical", "m-1", "1")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let active = coordinator.active_escalations_for("user-1").await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].stage, EscalationStage::EmergencyCall);

    let resolved = coordinator
        .acknowledge(&event.id, ResolvedBy::Operator)
        .await
        .unwrap();
    assert_eq!(resolved.stage, EscalationStage::Resolved);
    assert!(resolved.last_transition_at >= resolved.created_at);
    assert!(coordinator.active_escalations_for("user-1").await.is_empty());
    assert_eq!(gateway.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_acknowledgement_leaves_other_events_running() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    let event = coordinator
        .trigger("user-1", "health_critical", "m-1", "1")
        .await
        .unwrap();

    let err = coordinator
        .acknowledge("esc-does-not-exist", ResolvedBy::Guardian)
        .await
        .unwrap_err();
    assert!(matches!(err, EscalationError::NotFound(_)));

    tokio::time::sleep(Duration::from_secs(4)).await;
    let current = coordinator.event(&event.id).await.unwrap();
    assert_eq!(current.stage, EscalationStage::EmergencyCall);
    assert_eq!(gateway.on_channel(Channel::Emergency).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_notices_follow_the_event() {
    let (coordinator, _gateway) = coordinator_with([1.0, 1.0, 1.0]);
    let mut notices = coordinator.events().subscribe();

    let event = coordinator
        .trigger("user-1", "health_critical", "m-1", "1")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    coordinator
        .acknowledge(&event.id, ResolvedBy::Guardian)
        .await
        .unwrap();

    let types: Vec<&str> = notices
        .drain()
        .iter()
        .map(|n| n.notice_type())
        .collect();
    assert_eq!(
        types,
        vec!["triggered", "stage_fired", "stage_fired", "resolved"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_padded_subject_id_is_used_verbatim() {
    let (coordinator, gateway) = coordinator_with([1.0, 1.0, 1.0]);
    coordinator.set_guardians("user-1 ", vec!["g-1".into()]).await;

    let event = coordinator
        .trigger("user-1 ", "health_critical", "m-1", "1")
        .await
        .unwrap();
    assert_eq!(event.subject_id, "user-1 ");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let pushes = gateway.on_channel(Channel::Push);
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].notification.recipient_id, "g-1");
    assert_eq!(
        gateway.on_channel(Channel::InApp)[0].notification.recipient_id,
        "user-1 "
    );

    let active = coordinator.active_escalations_for("user-1 ").await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, event.id);
    assert!(coordinator.active_escalations_for("user-1").await.is_empty());

    let err = coordinator
        .trigger("   ", "health_critical", "m-2", "1")
        .await
        .unwrap_err();
    assert!(matches!(err, EscalationError::InvalidInput(_)));
}
