// ── Capability sink ──
//
// The seam between the adapter and whatever host displays the device.
// The poller and dispatcher only ever talk to a `CapabilitySink`.

use serde::Serialize;

use crate::error::CoreError;
use crate::model::{AlarmState, ArmMode, Capability, CapabilityValue, LocalState};

/// Whether the host should treat the device as usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Unknown,
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Host-side storage for capability values and device availability.
pub trait CapabilitySink: Send + Sync {
    fn get(&self, capability: Capability) -> Option<CapabilityValue>;

    fn set(&self, capability: Capability, value: CapabilityValue) -> Result<(), CoreError>;

    fn set_available(&self);

    fn set_unavailable(&self, reason: &str);

    // ── Typed readers ────────────────────────────────────────────────

    fn onoff(&self) -> Option<bool> {
        self.get(Capability::OnOff).and_then(CapabilityValue::as_bool)
    }

    fn arm_mode(&self) -> Option<ArmMode> {
        self.get(Capability::ArmMode)
            .and_then(CapabilityValue::as_arm_mode)
    }

    fn alarm_state(&self) -> Option<AlarmState> {
        self.get(Capability::HomeAlarmState)
            .and_then(CapabilityValue::as_alarm_state)
    }

    fn local_state(&self) -> Option<LocalState> {
        self.get(Capability::AlarmMode)
            .and_then(CapabilityValue::as_local_state)
    }
}

/// Bring `onoff` and `arm_mode` in line with `mode`, writing only the
/// values that differ.
pub(crate) fn reconcile_controls(sink: &dyn CapabilitySink, mode: ArmMode) -> Result<(), CoreError> {
    if sink.arm_mode() != Some(mode) {
        sink.set(Capability::ArmMode, mode.into())?;
    }
    let on = mode.onoff();
    if sink.onoff() != Some(on) {
        sink.set(Capability::OnOff, on.into())?;
    }
    Ok(())
}
