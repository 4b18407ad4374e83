// ── Device events ──
//
// Emitted on the device broadcast channel when a poll observes a new
// state. Hosts map these onto their own trigger/timeline mechanisms.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::state::LocalState;

/// A transition between two mapped states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub state: LocalState,
    /// `None` on the first observation; serialized as `"unknown"`.
    #[serde(serialize_with = "serialize_previous")]
    pub previous_state: Option<LocalState>,
    pub raw_state: i64,
}

impl StateChange {
    pub fn previous_label(&self) -> &'static str {
        self.previous_state.map_or("unknown", <&'static str>::from)
    }
}

#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn serialize_previous<S: Serializer>(
    previous: &Option<LocalState>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let label: &'static str = previous.map_or("unknown", <&'static str>::from);
    serializer.serialize_str(label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimelineSeverity {
    Info,
    Notice,
}

/// Human-readable record of a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub message: String,
    pub severity: TimelineSeverity,
    pub timestamp: DateTime<Utc>,
    pub metadata: TimelineMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineMetadata {
    pub from: String,
    pub to: String,
    pub raw_state: i64,
}

impl TimelineEntry {
    /// Armed states are recorded as notices, disarming as info.
    pub fn for_change(change: &StateChange, timestamp: DateTime<Utc>) -> Self {
        let from = change.previous_label();
        let to: &'static str = change.state.into();
        let severity = if change.state.is_armed() {
            TimelineSeverity::Notice
        } else {
            TimelineSeverity::Info
        };
        Self {
            message: format!("Alarm state changed from {from} to {to}"),
            severity,
            timestamp,
            metadata: TimelineMetadata {
                from: from.to_owned(),
                to: to.to_owned(),
                raw_state: change.raw_state,
            },
        }
    }
}

/// Everything a device publishes on its event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    StateChanged(StateChange),
    Timeline(TimelineEntry),
}
