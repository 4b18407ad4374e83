// ── Alarm state domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Semantic arm state of the panel, as last observed by a poll.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocalState {
    Disarmed,
    ArmedStay,
    ArmedAway,
    ArmedNight,
}

impl LocalState {
    /// Three-valued projection used by the `homealarm_state` capability.
    pub fn coarse(self) -> AlarmState {
        match self {
            Self::Disarmed => AlarmState::Disarmed,
            Self::ArmedStay | Self::ArmedNight => AlarmState::PartiallyArmed,
            Self::ArmedAway => AlarmState::Armed,
        }
    }

    /// Control-surface mode mirroring this state.
    pub fn arm_mode(self) -> ArmMode {
        match self {
            Self::Disarmed => ArmMode::Disarmed,
            Self::ArmedStay => ArmMode::Stay,
            Self::ArmedAway => ArmMode::Away,
            Self::ArmedNight => ArmMode::Night,
        }
    }

    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Disarmed)
    }
}

/// Coarse alarm state (`homealarm_state` capability).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlarmState {
    Disarmed,
    PartiallyArmed,
    Armed,
}

/// Mode shown on the arm-mode control (`arm_mode` capability).
///
/// Written optimistically by commands and reconciled by every poll.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArmMode {
    Disarmed,
    Stay,
    Away,
    Night,
}

impl ArmMode {
    /// Value of the binary `onoff` control for this mode. Only a full
    /// away arm counts as "on".
    pub fn onoff(self) -> bool {
        matches!(self, Self::Away)
    }
}

/// Targets accepted by the "alarm is …" condition check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConditionTarget {
    Away,
    Stay,
    Disarmed,
}

impl ConditionTarget {
    pub fn matches(self, state: AlarmState) -> bool {
        matches!(
            (self, state),
            (Self::Away, AlarmState::Armed)
                | (Self::Stay, AlarmState::PartiallyArmed)
                | (Self::Disarmed, AlarmState::Disarmed)
        )
    }
}
