// ── State poller ──
//
// One tick = fetch the system state, map the first partition's raw code,
// write changed capabilities, emit events, and re-sync the control
// mirrors. The background loop and re-auth policy live in `device`.

use std::sync::Arc;

use alarmlink_api::AlarmApi;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::mapper::{ARMING_CODE, StateMapping, map_code};
use crate::model::{Capability, DeviceEvent, LocalState, StateChange, TimelineEntry};
use crate::session::SessionManager;
use crate::sink::{CapabilitySink, reconcile_controls};

/// What a single poll tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new mapped state was written and announced.
    Changed(StateChange),
    /// The panel still reports the stored state.
    Unchanged { state: LocalState },
    /// Unknown or transient code; nothing was written.
    Unmapped { code: i64 },
    /// The response carried no partitions.
    NoPartitionData,
    /// The state request was rejected for authentication reasons. The
    /// caller is expected to force a reconnect.
    AuthExpired,
}

pub struct Poller {
    api: Arc<dyn AlarmApi>,
    sessions: Arc<SessionManager>,
    sink: Arc<dyn CapabilitySink>,
    events: broadcast::Sender<Arc<DeviceEvent>>,
    last_changed: watch::Sender<Option<DateTime<Utc>>>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn AlarmApi>,
        sessions: Arc<SessionManager>,
        sink: Arc<dyn CapabilitySink>,
        events: broadcast::Sender<Arc<DeviceEvent>>,
    ) -> Self {
        let (last_changed, _) = watch::channel(None);
        Self {
            api,
            sessions,
            sink,
            events,
            last_changed,
        }
    }

    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        *self.last_changed.borrow()
    }

    pub fn subscribe_last_changed(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_changed.subscribe()
    }

    /// Run one poll against the remote service.
    ///
    /// Returns `NotConnected` without any remote call when no session is
    /// held. Authentication rejections are reported as
    /// [`PollOutcome::AuthExpired`], not as errors.
    pub async fn tick(&self) -> Result<PollOutcome, CoreError> {
        let Some((session, system)) = self.sessions.active() else {
            return Err(CoreError::NotConnected);
        };

        let state = match self.api.get_state(&system, &session).await {
            Ok(state) => state,
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "state request rejected, session needs renewal");
                return Ok(PollOutcome::AuthExpired);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(partition) = state.first_partition() else {
            warn!(system = %system, "state response has no partition data");
            return Ok(PollOutcome::NoPartitionData);
        };

        debug!(
            partition = %partition.id,
            raw_state = partition.attributes.state,
            arm_type = ?partition.attributes.arm_type,
            "state received"
        );
        self.apply(partition.attributes.state)
    }

    /// Apply a raw state code to the sink.
    pub fn apply(&self, code: i64) -> Result<PollOutcome, CoreError> {
        let (local, coarse) = match map_code(code) {
            StateMapping::Mapped { local, coarse } => (local, coarse),
            StateMapping::Unmapped { code } => {
                if code == ARMING_CODE {
                    debug!(raw_state = code, "panel is arming, keeping last state");
                } else {
                    debug!(raw_state = code, "unmapped state code, keeping last state");
                }
                return Ok(PollOutcome::Unmapped { code });
            }
        };

        let previous = self.sink.local_state();
        let outcome = if previous == Some(local) && self.sink.alarm_state() == Some(coarse) {
            PollOutcome::Unchanged { state: local }
        } else {
            self.sink.set(Capability::AlarmMode, local.into())?;
            self.sink.set(Capability::HomeAlarmState, coarse.into())?;

            let change = StateChange {
                state: local,
                previous_state: previous,
                raw_state: code,
            };
            let now = Utc::now();
            info!(
                from = change.previous_label(),
                to = %local,
                raw_state = code,
                "alarm state changed"
            );
            let entry = TimelineEntry::for_change(&change, now);
            // No subscribers is not an error.
            let _ = self
                .events
                .send(Arc::new(DeviceEvent::StateChanged(change.clone())));
            let _ = self.events.send(Arc::new(DeviceEvent::Timeline(entry)));
            self.last_changed.send_replace(Some(now));
            PollOutcome::Changed(change)
        };

        reconcile_controls(self.sink.as_ref(), local.arm_mode())?;
        Ok(outcome)
    }
}
