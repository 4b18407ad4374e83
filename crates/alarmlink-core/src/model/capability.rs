use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::state::{AlarmState, ArmMode, LocalState};

/// Host-visible attributes the adapter keeps up to date.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum Capability {
    /// Binary control: on iff armed away.
    #[serde(rename = "onoff")]
    #[strum(serialize = "onoff")]
    OnOff,
    /// Multi-mode control: disarmed / stay / away / night.
    #[serde(rename = "arm_mode")]
    #[strum(serialize = "arm_mode")]
    ArmMode,
    /// Coarse state: disarmed / partially_armed / armed.
    #[serde(rename = "homealarm_state")]
    #[strum(serialize = "homealarm_state")]
    HomeAlarmState,
    /// Last mapped local state, including `armed_night`.
    #[serde(rename = "alarm_mode")]
    #[strum(serialize = "alarm_mode")]
    AlarmMode,
}

/// Value stored under a [`Capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    ArmMode(ArmMode),
    AlarmState(AlarmState),
    LocalState(LocalState),
}

impl CapabilityValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_arm_mode(self) -> Option<ArmMode> {
        match self {
            Self::ArmMode(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_alarm_state(self) -> Option<AlarmState> {
        match self {
            Self::AlarmState(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_local_state(self) -> Option<LocalState> {
        match self {
            Self::LocalState(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<ArmMode> for CapabilityValue {
    fn from(v: ArmMode) -> Self {
        Self::ArmMode(v)
    }
}

impl From<AlarmState> for CapabilityValue {
    fn from(v: AlarmState) -> Self {
        Self::AlarmState(v)
    }
}

impl From<LocalState> for CapabilityValue {
    fn from(v: LocalState) -> Self {
        Self::LocalState(v)
    }
}
