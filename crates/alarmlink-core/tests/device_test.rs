#![allow(clippy::unwrap_used)]
// Device lifecycle tests against a recording `AlarmApi` double.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use alarmlink_api::AlarmApi;
use alarmlink_core::dispatcher::CommandDispatcher;
use alarmlink_core::session::SessionManager;
use alarmlink_core::{
    AlarmState, ArmMode, Availability, CapabilitySink, Command, ConditionTarget, CoreError,
    Credentials, DeviceEvent, LocalState, PollOutcome, TimelineSeverity,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;

use common::{LoginScript, MockApi, StateReply, config, credentials, device_with};

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Arc<DeviceEvent>>) -> Vec<Arc<DeviceEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ── Connection ──────────────────────────────────────────────────────

#[tokio::test]
async fn connect_without_credentials_marks_unavailable() {
    let api = MockApi::new(1);
    let mut cfg = config();
    cfg.credentials = Credentials::new("", SecretString::from(String::new()));
    let (device, store) = device_with(&api, cfg);

    let err = device.connect(false).await.unwrap_err();

    assert!(matches!(err, CoreError::MissingCredentials));
    assert_eq!(api.logins(), 0);
    assert_eq!(store.availability().reason(), Some("Missing credentials"));
}

#[tokio::test]
async fn connect_seeds_state_and_marks_available() {
    let api = MockApi::new(2);
    let (device, store) = device_with(&api, config());

    device.connect(false).await.unwrap();

    assert_eq!(api.logins(), 1);
    assert_eq!(api.state_calls(), 1);
    assert_eq!(store.availability(), Availability::Available);
    assert_eq!(store.local_state(), Some(LocalState::ArmedStay));
    assert_eq!(store.alarm_state(), Some(AlarmState::PartiallyArmed));
    assert_eq!(store.arm_mode(), Some(ArmMode::Stay));
    assert_eq!(store.onoff(), Some(false));
}

#[tokio::test]
async fn connect_without_force_reuses_session() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());

    device.connect(false).await.unwrap();
    device.connect(false).await.unwrap();
    assert_eq!(api.logins(), 1);

    device.connect(true).await.unwrap();
    assert_eq!(api.logins(), 2);
}

#[tokio::test]
async fn rejected_login_clears_session() {
    let api = MockApi::new(1);
    let (device, store) = device_with(&api, config());
    device.connect(false).await.unwrap();
    assert!(device.is_connected());

    api.set_login(LoginScript::Reject("invalid password"));
    let err = device.connect(true).await.unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert!(!device.is_connected());
    assert_eq!(
        store.availability().reason(),
        Some("Login failed: invalid password")
    );
}

#[tokio::test]
async fn account_without_systems_is_rejected() {
    let api = MockApi::new(1);
    api.set_login(LoginScript::Succeed(vec![]));
    let (device, store) = device_with(&api, config());

    let err = device.connect(false).await.unwrap_err();

    assert!(matches!(err, CoreError::NoSystemsFound));
    assert!(!device.is_connected());
    assert_eq!(api.state_calls(), 0);
    assert_eq!(
        store.availability().reason(),
        Some("Login failed: No systems found")
    );
}

#[tokio::test]
async fn failed_seed_fetch_is_not_a_login_failure() {
    let api = MockApi::new(1);
    api.push_state(StateReply::ServerError("gateway down"));
    let (device, store) = device_with(&api, config());

    let err = device.connect(false).await.unwrap_err();

    assert!(matches!(err, CoreError::InitialStateFailed { .. }));
    assert!(device.is_connected(), "session must survive a failed seed fetch");
    assert!(!store.availability().is_available());

    // The next good poll brings the device back.
    device.poll().await.unwrap();
    assert!(store.availability().is_available());
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn transition_emits_one_event_and_one_notice() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    let mut rx = device.subscribe();
    device.connect(false).await.unwrap();
    drain(&mut rx);

    api.set_code(3);
    let outcome = device.poll().await.unwrap();
    assert!(matches!(outcome, PollOutcome::Changed(_)));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    match &*events[0] {
        DeviceEvent::StateChanged(change) => {
            assert_eq!(change.state, LocalState::ArmedAway);
            assert_eq!(change.previous_state, Some(LocalState::Disarmed));
            assert_eq!(change.raw_state, 3);
        }
        other => panic!("expected state change, got {other:?}"),
    }
    match &*events[1] {
        DeviceEvent::Timeline(entry) => {
            assert_eq!(entry.severity, TimelineSeverity::Notice);
            assert_eq!(entry.metadata.from, "disarmed");
            assert_eq!(entry.metadata.to, "armed_away");
        }
        other => panic!("expected timeline entry, got {other:?}"),
    }
    assert!(device.status().last_changed.is_some());
}

#[tokio::test]
async fn repeated_state_is_silent_but_mirrors_are_reconciled() {
    let api = MockApi::new(1);
    let (device, store) = device_with(&api, config());
    let mut rx = device.subscribe();
    device.connect(false).await.unwrap();
    drain(&mut rx);

    store
        .set(alarmlink_core::Capability::OnOff, true.into())
        .unwrap();
    store
        .set(alarmlink_core::Capability::ArmMode, ArmMode::Away.into())
        .unwrap();

    let outcome = device.poll().await.unwrap();

    assert_eq!(
        outcome,
        PollOutcome::Unchanged {
            state: LocalState::Disarmed
        }
    );
    assert!(drain(&mut rx).is_empty());
    assert_eq!(store.onoff(), Some(false));
    assert_eq!(store.arm_mode(), Some(ArmMode::Disarmed));
}

#[tokio::test]
async fn unmapped_codes_leave_capabilities_untouched() {
    let api = MockApi::new(2);
    let (device, store) = device_with(&api, config());
    let mut rx = device.subscribe();
    device.connect(false).await.unwrap();
    drain(&mut rx);
    let writes = store.write_count();

    for code in [8, 0, 42] {
        api.set_code(code);
        assert_eq!(device.poll().await.unwrap(), PollOutcome::Unmapped { code });
    }

    assert_eq!(store.write_count(), writes);
    assert_eq!(store.local_state(), Some(LocalState::ArmedStay));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn missing_partition_data_is_soft() {
    let api = MockApi::new(1);
    let (device, store) = device_with(&api, config());
    device.connect(false).await.unwrap();

    api.push_state(StateReply::NoPartitions);
    assert_eq!(device.poll().await.unwrap(), PollOutcome::NoPartitionData);
    assert!(store.availability().is_available());
}

#[tokio::test]
async fn auth_rejection_forces_reconnect() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    device.connect(false).await.unwrap();
    assert_eq!(api.logins(), 1);

    api.push_state(StateReply::AuthError);
    let outcome = device.poll().await.unwrap();

    assert_eq!(outcome, PollOutcome::AuthExpired);
    assert_eq!(api.logins(), 2);
    assert!(device.is_connected());
}

#[tokio::test]
async fn poll_without_session_makes_no_remote_call() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());

    let err = device.poll().await.unwrap_err();

    assert!(matches!(err, CoreError::NotConnected));
    assert_eq!(api.remote_calls(), 0);
}

#[tokio::test]
async fn repeated_failures_mark_device_unavailable() {
    let api = MockApi::new(1);
    let mut cfg = config();
    cfg.unavailable_after_failures = 2;
    let (device, store) = device_with(&api, cfg);
    device.connect(false).await.unwrap();

    api.push_state(StateReply::ServerError("gateway down"));
    device.poll().await.unwrap_err();
    assert!(store.availability().is_available());

    api.push_state(StateReply::ServerError("gateway down"));
    device.poll().await.unwrap_err();
    let reason = store.availability().reason().map(str::to_string).unwrap();
    assert!(reason.starts_with("Polling failed 2 times:"), "got: {reason}");
    assert!(reason.contains("gateway down"), "got: {reason}");

    device.poll().await.unwrap();
    assert!(store.availability().is_available());
}

#[tokio::test]
async fn zero_threshold_never_flips_availability() {
    let api = MockApi::new(1);
    let mut cfg = config();
    cfg.unavailable_after_failures = 0;
    let (device, store) = device_with(&api, cfg);
    device.connect(false).await.unwrap();

    for _ in 0..10 {
        api.push_state(StateReply::ServerError("gateway down"));
        device.poll().await.unwrap_err();
    }
    assert!(store.availability().is_available());
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_without_session_fails_before_remote_call() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());

    let err = device.execute(Command::ArmAway, None).await.unwrap_err();

    assert!(matches!(err, CoreError::NotConnected));
    assert_eq!(api.remote_calls(), 0);
}

#[tokio::test]
async fn successful_dispatch_reconciles_before_any_repoll() {
    let api = MockApi::new(1);
    let store = Arc::new(alarmlink_core::CapabilityStore::new());
    let api_dyn: Arc<dyn AlarmApi> = Arc::clone(&api) as Arc<dyn AlarmApi>;
    let sessions = Arc::new(SessionManager::new(Arc::clone(&api_dyn)));
    sessions.connect(&credentials(), false).await.unwrap();
    let dispatcher = CommandDispatcher::new(
        api_dyn,
        Arc::clone(&sessions),
        Arc::clone(&store) as Arc<dyn CapabilitySink>,
    );

    dispatcher.dispatch(Command::ArmAway, None).await.unwrap();

    assert_eq!(store.onoff(), Some(true));
    assert_eq!(store.arm_mode(), Some(ArmMode::Away));
    assert_eq!(api.state_calls(), 0);
    assert_eq!(api.arm_away_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_command_propagates_and_changes_nothing() {
    let api = MockApi::new(1);
    let (device, store) = device_with(&api, config());
    device.connect(false).await.unwrap();
    api.reject_actions.store(true, Ordering::SeqCst);
    let writes = store.write_count();
    let polls = api.state_calls();

    let err = device.execute(Command::ArmStay, None).await.unwrap_err();

    match err {
        CoreError::ActionFailed { command, ref source } => {
            assert_eq!(command, Command::ArmStay);
            assert!(source.to_string().contains("zone 3 open"));
        }
        ref other => panic!("expected ActionFailed, got {other:?}"),
    }
    assert_eq!(store.write_count(), writes);
    assert_eq!(api.state_calls(), polls, "no re-poll after a failed command");
}

#[tokio::test]
async fn default_pin_is_used_when_none_given() {
    let api = MockApi::new(1);
    let mut cfg = config();
    cfg.credentials.default_pin = Some(SecretString::from("4321".to_string()));
    let (device, _store) = device_with(&api, cfg);
    device.connect(false).await.unwrap();

    device.execute(Command::Disarm, None).await.unwrap();
    assert_eq!(api.last_pin.lock().unwrap().as_deref(), Some("4321"));

    device
        .execute(Command::Disarm, Some(SecretString::from("1111".to_string())))
        .await
        .unwrap();
    assert_eq!(api.last_pin.lock().unwrap().as_deref(), Some("1111"));
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn command_triggers_immediate_and_delayed_repoll() {
    let api = MockApi::new(1);
    let (device, store) = device_with(&api, config());
    device.connect(false).await.unwrap();
    let polls = api.state_calls();

    // Panel reports "arming" right away, settles later.
    api.set_code(8);
    device.execute(Command::ArmAway, None).await.unwrap();
    assert_eq!(api.state_calls(), polls + 1);
    assert_eq!(store.arm_mode(), Some(ArmMode::Away));
    assert_eq!(store.local_state(), Some(LocalState::Disarmed));

    api.set_code(3);
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(api.state_calls(), polls + 2);
    assert_eq!(store.local_state(), Some(LocalState::ArmedAway));
    assert!(device.is_state(ConditionTarget::Away));
    device.shutdown().await;
}

#[tokio::test]
async fn night_mode_sends_nothing() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    device.connect(false).await.unwrap();
    let calls = api.remote_calls();

    device.set_arm_mode(ArmMode::Night, None).await.unwrap();
    assert_eq!(api.remote_calls(), calls);

    api.panel_follows.store(true, Ordering::SeqCst);
    device.set_onoff(true, None).await.unwrap();
    assert_eq!(api.arm_away_calls.load(Ordering::SeqCst), 1);
    device.shutdown().await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn background_polling_runs_until_shutdown() {
    let api = MockApi::new(1);
    let cfg = config().with_poll_interval(Duration::from_secs(60));
    let (device, _store) = device_with(&api, cfg);

    device.start().await.unwrap();
    assert_eq!(api.state_calls(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(api.state_calls(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.state_calls(), 3);

    device.shutdown().await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(api.state_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_restarts_leave_one_loop() {
    let api = MockApi::new(1);
    let cfg = config().with_poll_interval(Duration::from_secs(60));
    let (device, _store) = device_with(&api, cfg);
    device.start().await.unwrap();

    tokio::join!(device.start_polling(), device.start_polling());
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(api.state_calls(), 2, "exactly one loop ticks");

    device.stop_polling().await;
    let calls = api.state_calls();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(api.state_calls(), calls, "no loop survives stop_polling");
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_repoll() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    device.connect(false).await.unwrap();

    device.execute(Command::ArmAway, None).await.unwrap();
    let calls = api.state_calls();
    device.shutdown().await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.state_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn reconnect_from_command_repoll_restarts_period() {
    let api = MockApi::new(1);
    let cfg = config().with_poll_interval(Duration::from_secs(60));
    let (device, _store) = device_with(&api, cfg);
    device.start().await.unwrap();
    assert_eq!(api.state_calls(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    // The immediate re-poll is refused, which forces a fresh login.
    api.push_state(StateReply::AuthError);
    device.execute(Command::ArmAway, None).await.unwrap();
    assert_eq!(api.logins(), 2);
    assert_eq!(api.state_calls(), 3);

    // Delayed re-poll at t=33; the loop no longer fires at t=60.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(api.state_calls(), 4);

    // Next loop tick lands one full period after the reconnect.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.state_calls(), 5);
    device.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_change_restarts_polling() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    device.start().await.unwrap();

    let updated = config().with_poll_interval(Duration::from_secs(10));
    let change = device.update_config(updated).await.unwrap();
    assert!(change.poll_interval);
    assert!(!change.credentials);
    assert_eq!(api.logins(), 1);

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(api.state_calls(), 3);
    device.shutdown().await;
}

#[tokio::test]
async fn credential_change_forces_login() {
    let api = MockApi::new(1);
    let (device, _store) = device_with(&api, config());
    device.connect(false).await.unwrap();

    let mut updated = config();
    updated.credentials.password = SecretString::from("new-password".to_string());
    let change = device.update_config(updated).await.unwrap();

    assert!(change.credentials);
    assert_eq!(api.logins(), 2);
    device.shutdown().await;
}

#[tokio::test]
async fn status_and_conditions_follow_sink() {
    let api = MockApi::new(4);
    let (device, _store) = device_with(&api, config());
    device.connect(false).await.unwrap();

    let status = device.status();
    assert_eq!(status.id, "part-1");
    assert_eq!(status.state, Some(LocalState::ArmedNight));
    assert_eq!(status.homealarm_state, Some(AlarmState::PartiallyArmed));
    assert_eq!(status.arm_mode, Some(ArmMode::Night));
    assert_eq!(status.onoff, Some(false));
    assert!(device.is_state(ConditionTarget::Stay));
    assert!(!device.is_state(ConditionTarget::Away));
    assert!(!device.is_state(ConditionTarget::Disarmed));
}
