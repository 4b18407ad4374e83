// ── Command dispatch ──
//
// Turns a user intent into one remote arm/disarm call. On success the
// control mirrors are written optimistically; the follow-up re-polls are
// scheduled by `Device::execute`.

use std::sync::Arc;

use alarmlink_api::AlarmApi;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::ArmMode;
use crate::session::SessionManager;
use crate::sink::{CapabilitySink, reconcile_controls};

/// A remote arm/disarm request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    ArmAway,
    ArmStay,
    Disarm,
}

impl Command {
    /// Binary control: on arms away, off disarms.
    pub fn from_onoff(on: bool) -> Self {
        if on { Self::ArmAway } else { Self::Disarm }
    }

    /// Multi-mode control. Night has no remote command.
    pub fn for_mode(mode: ArmMode) -> Option<Self> {
        match mode {
            ArmMode::Away => Some(Self::ArmAway),
            ArmMode::Stay => Some(Self::ArmStay),
            ArmMode::Disarmed => Some(Self::Disarm),
            ArmMode::Night => None,
        }
    }

    /// Mode the controls should show once the command is accepted.
    pub fn target_mode(self) -> ArmMode {
        match self {
            Self::ArmAway => ArmMode::Away,
            Self::ArmStay => ArmMode::Stay,
            Self::Disarm => ArmMode::Disarmed,
        }
    }
}

pub struct CommandDispatcher {
    api: Arc<dyn AlarmApi>,
    sessions: Arc<SessionManager>,
    sink: Arc<dyn CapabilitySink>,
}

impl CommandDispatcher {
    pub fn new(
        api: Arc<dyn AlarmApi>,
        sessions: Arc<SessionManager>,
        sink: Arc<dyn CapabilitySink>,
    ) -> Self {
        Self {
            api,
            sessions,
            sink,
        }
    }

    /// Issue `command` with an already-resolved PIN.
    ///
    /// Fails with `NotConnected` before any remote call when no session is
    /// held. A remote failure leaves the capabilities untouched.
    pub async fn dispatch(
        &self,
        command: Command,
        pin: Option<&SecretString>,
    ) -> Result<(), CoreError> {
        let Some((session, system)) = self.sessions.active() else {
            warn!(%command, "command rejected: no active session");
            return Err(CoreError::NotConnected);
        };

        info!(%command, system = %system, has_pin = pin.is_some(), "sending command");
        let result = match command {
            Command::ArmAway => self.api.arm_away(&system, &session, pin).await,
            Command::ArmStay => self.api.arm_stay(&system, &session, pin).await,
            Command::Disarm => self.api.disarm(&system, &session, pin).await,
        };

        if let Err(source) = result {
            warn!(%command, error = %source, "command failed");
            return Err(CoreError::ActionFailed { command, source });
        }

        reconcile_controls(self.sink.as_ref(), command.target_mode())
    }
}
