// ── Domain model ──
//
// Host-neutral types for alarm state, capabilities, and device events.

pub mod capability;
pub mod event;
pub mod state;

pub use capability::{Capability, CapabilityValue};
pub use event::{DeviceEvent, StateChange, TimelineEntry, TimelineMetadata, TimelineSeverity};
pub use state::{AlarmState, ArmMode, ConditionTarget, LocalState};
