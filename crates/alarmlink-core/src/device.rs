// ── Device abstraction ──
//
// Full lifecycle of one alarm panel: connect, background polling,
// command execution with follow-up re-polls, settings changes, and
// teardown. Cheap to clone; all state lives behind an `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use alarmlink_api::AlarmApi;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DeviceConfig, SettingsChange};
use crate::dispatcher::{Command, CommandDispatcher};
use crate::error::CoreError;
use crate::model::{AlarmState, ArmMode, ConditionTarget, DeviceEvent, LocalState};
use crate::poller::{PollOutcome, Poller};
use crate::session::SessionManager;
use crate::sink::{Availability, CapabilitySink};

const EVENT_CHANNEL_SIZE: usize = 64;

/// Point-in-time view of a device, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub id: String,
    pub availability: Availability,
    pub state: Option<LocalState>,
    pub homealarm_state: Option<AlarmState>,
    pub arm_mode: Option<ArmMode>,
    pub onoff: Option<bool>,
    pub last_changed: Option<DateTime<Utc>>,
}

// ── Device ───────────────────────────────────────────────────────

/// One paired alarm panel.
///
/// Does nothing until [`start`](Self::start) or [`connect`](Self::connect)
/// is called. Call [`shutdown`](Self::shutdown) before dropping the last
/// handle so background tasks are cancelled and joined.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    id: String,
    config: ArcSwap<DeviceConfig>,
    sink: Arc<dyn CapabilitySink>,
    sessions: Arc<SessionManager>,
    poller: Poller,
    dispatcher: CommandDispatcher,
    event_tx: broadcast::Sender<Arc<DeviceEvent>>,
    availability: watch::Sender<Availability>,
    consecutive_failures: AtomicU32,
    cancel: CancellationToken,
    /// The running poll loop. Held locked across a whole stop-then-spawn
    /// so concurrent restarts leave exactly one loop behind.
    poll_loop: Mutex<Option<PollLoop>>,
    /// Signalled on every fresh login so the loop restarts its period.
    reconnected: Notify,
    /// Pending delayed re-polls scheduled by commands.
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

struct PollLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollLoop {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        config: DeviceConfig,
        api: Arc<dyn AlarmApi>,
        sink: Arc<dyn CapabilitySink>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(Arc::clone(&api)));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (availability, _) = watch::channel(Availability::Unknown);
        let cancel = CancellationToken::new();

        let poller = Poller::new(
            Arc::clone(&api),
            Arc::clone(&sessions),
            Arc::clone(&sink),
            event_tx.clone(),
        );
        let dispatcher = CommandDispatcher::new(api, Arc::clone(&sessions), Arc::clone(&sink));

        Self {
            inner: Arc::new(DeviceInner {
                id: id.into(),
                config: ArcSwap::from_pointee(config),
                sink,
                sessions,
                poller,
                dispatcher,
                event_tx,
                availability,
                consecutive_failures: AtomicU32::new(0),
                cancel,
                poll_loop: Mutex::new(None),
                reconnected: Notify::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> Arc<DeviceConfig> {
        self.inner.config.load_full()
    }

    pub fn sink(&self) -> &Arc<dyn CapabilitySink> {
        &self.inner.sink
    }

    pub fn is_connected(&self) -> bool {
        self.inner.sessions.is_connected()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Connect (without forcing) and start background polling.
    ///
    /// Polling starts even when the connect fails; the device stays
    /// unavailable until a later reconnect succeeds.
    pub async fn start(&self) -> Result<(), CoreError> {
        let result = self.connect(false).await;
        if let Err(ref e) = result {
            warn!(device = %self.inner.id, error = %e, "initial connect failed");
        }
        self.start_polling().await;
        result
    }

    /// Ensure an authenticated session exists.
    ///
    /// With `force = false` an existing session is reused and no remote
    /// call is made. A fresh login is followed by one state fetch that
    /// seeds the capabilities and marks the device available.
    pub async fn connect(&self, force: bool) -> Result<(), CoreError> {
        let config = self.inner.config.load_full();

        let connection = match self.inner.sessions.connect(&config.credentials, force).await {
            Ok(connection) => connection,
            Err(e) => {
                self.mark_unavailable(&e.unavailable_reason());
                return Err(e);
            }
        };
        if !connection.is_new() {
            debug!(device = %self.inner.id, "reusing existing session");
            return Ok(());
        }
        self.inner.reconnected.notify_one();

        match self.inner.poller.tick().await {
            Ok(PollOutcome::AuthExpired) => {
                let err = CoreError::InitialStateFailed {
                    message: "state request rejected right after login".into(),
                };
                self.mark_unavailable(&err.unavailable_reason());
                Err(err)
            }
            Ok(outcome) => {
                debug!(device = %self.inner.id, ?outcome, "initial state loaded");
                self.inner.consecutive_failures.store(0, Ordering::Relaxed);
                self.mark_available();
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.inner.id, error = %e, "initial state fetch failed");
                let err = CoreError::InitialStateFailed {
                    message: e.to_string(),
                };
                self.mark_unavailable(&err.unavailable_reason());
                Err(err)
            }
        }
    }

    /// (Re)start the background poll loop with the configured interval.
    ///
    /// Any running loop is cancelled and joined first, so ticks from the
    /// old and new loops never overlap.
    pub async fn start_polling(&self) {
        let mut slot = self.inner.poll_loop.lock().await;
        if let Some(running) = slot.take() {
            running.stop().await;
        }
        if self.inner.cancel.is_cancelled() {
            return;
        }

        let period = self.inner.config.load().effective_poll_interval();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(poll_task(self.clone(), period, cancel.clone()));
        *slot = Some(PollLoop { cancel, handle });
        info!(device = %self.inner.id, interval_secs = period.as_secs(), "polling started");
    }

    pub async fn stop_polling(&self) {
        let mut slot = self.inner.poll_loop.lock().await;
        if let Some(running) = slot.take() {
            running.stop().await;
            debug!(device = %self.inner.id, "polling stopped");
        }
    }

    /// Cancel every background task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop_polling().await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.inner.sessions.invalidate();
        info!(device = %self.inner.id, "device shut down");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one poll tick and apply the device's failure policy.
    ///
    /// An authentication rejection triggers a forced reconnect; other
    /// failures count towards the unavailability threshold.
    pub async fn poll(&self) -> Result<PollOutcome, CoreError> {
        match self.inner.poller.tick().await {
            Ok(PollOutcome::AuthExpired) => {
                info!(device = %self.inner.id, "forcing reconnect");
                if let Err(e) = self.connect(true).await {
                    warn!(device = %self.inner.id, error = %e, "reconnect failed");
                }
                Ok(PollOutcome::AuthExpired)
            }
            Ok(outcome) => {
                self.record_poll_success();
                Ok(outcome)
            }
            Err(CoreError::NotConnected) => {
                debug!(device = %self.inner.id, "poll skipped, not connected");
                Err(CoreError::NotConnected)
            }
            Err(e) => {
                warn!(device = %self.inner.id, error = %e, "poll failed");
                self.record_poll_failure(&e);
                Err(e)
            }
        }
    }

    fn record_poll_success(&self) {
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
        if !self.inner.availability.borrow().is_available() {
            self.mark_available();
        }
    }

    fn record_poll_failure(&self, err: &CoreError) {
        let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let threshold = self.inner.config.load().unavailable_after_failures;
        if threshold > 0 && failures >= threshold {
            self.mark_unavailable(&format!("Polling failed {failures} times: {err}"));
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Execute a command, falling back to the configured default PIN.
    ///
    /// On success the controls are reconciled optimistically, then the
    /// state is re-polled immediately and once more after the refresh
    /// delay. Re-poll failures are logged, never returned.
    pub async fn execute(&self, command: Command, pin: Option<SecretString>) -> Result<(), CoreError> {
        let config = self.inner.config.load_full();
        let pin = pin.or_else(|| config.credentials.default_pin.clone());

        self.inner.dispatcher.dispatch(command, pin.as_ref()).await?;
        self.refresh_after_command(config.refresh_delay).await;
        Ok(())
    }

    /// Handle the binary control.
    pub async fn set_onoff(&self, on: bool, pin: Option<SecretString>) -> Result<(), CoreError> {
        self.execute(Command::from_onoff(on), pin).await
    }

    /// Handle the multi-mode control. Night is accepted but sends nothing.
    pub async fn set_arm_mode(
        &self,
        mode: ArmMode,
        pin: Option<SecretString>,
    ) -> Result<(), CoreError> {
        match Command::for_mode(mode) {
            Some(command) => self.execute(command, pin).await,
            None => {
                info!(device = %self.inner.id, %mode, "mode has no remote command, ignoring");
                Ok(())
            }
        }
    }

    async fn refresh_after_command(&self, delay: Duration) {
        if let Err(e) = self.poll().await {
            debug!(device = %self.inner.id, error = %e, "immediate re-poll failed");
        }

        let device = self.clone();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Err(e) = device.poll().await {
                        debug!(device = %device.inner.id, error = %e, "delayed re-poll failed");
                    }
                }
            }
        });

        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Replace the configuration and react to what changed.
    ///
    /// Credential changes force a new login; both credential and interval
    /// changes restart the poll loop. The new configuration is stored
    /// even when the forced login fails.
    pub async fn update_config(&self, config: DeviceConfig) -> Result<SettingsChange, CoreError> {
        let previous = self.inner.config.swap(Arc::new(config));
        let change = SettingsChange::between(&previous, &self.inner.config.load());
        if change.is_empty() {
            debug!(device = %self.inner.id, "settings unchanged");
            return Ok(change);
        }
        info!(device = %self.inner.id, ?change, "settings changed");

        let reconnect = if change.credentials {
            self.connect(true).await
        } else {
            Ok(())
        };
        if change.credentials || change.poll_interval {
            self.start_polling().await;
        }
        reconnect.map(|()| change)
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DeviceEvent>> {
        self.inner.event_tx.subscribe()
    }

    pub fn availability(&self) -> watch::Receiver<Availability> {
        self.inner.availability.subscribe()
    }

    pub fn last_changed(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.poller.subscribe_last_changed()
    }

    /// "Alarm is …" condition, evaluated against the stored coarse state.
    pub fn is_state(&self, target: ConditionTarget) -> bool {
        self.inner
            .sink
            .alarm_state()
            .is_some_and(|state| target.matches(state))
    }

    pub fn status(&self) -> DeviceStatus {
        let sink = &self.inner.sink;
        DeviceStatus {
            id: self.inner.id.clone(),
            availability: self.inner.availability.borrow().clone(),
            state: sink.local_state(),
            homealarm_state: sink.alarm_state(),
            arm_mode: sink.arm_mode(),
            onoff: sink.onoff(),
            last_changed: self.inner.poller.last_changed(),
        }
    }

    // ── Availability ─────────────────────────────────────────────

    fn mark_available(&self) {
        self.inner.availability.send_replace(Availability::Available);
        self.inner.sink.set_available();
    }

    fn mark_unavailable(&self, reason: &str) {
        warn!(device = %self.inner.id, reason, "device unavailable");
        self.inner.availability.send_replace(Availability::Unavailable {
            reason: reason.to_owned(),
        });
        self.inner.sink.set_unavailable(reason);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodic poll loop. A tick runs to completion before the next one can
/// fire; any fresh login, including one made by a command re-poll,
/// restarts the period.
async fn poll_task(device: Device, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = device.inner.reconnected.notified() => interval.reset(),
            _ = interval.tick() => {
                let _ = device.poll().await;
            }
        }
    }
}
