// alarmlink-core: Polling, reconciliation, and command dispatch between
// alarmlink-api and a host that displays capabilities.

pub mod config;
pub mod device;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod mapper;
pub mod model;
pub mod poller;
pub mod session;
pub mod sink;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{Credentials, DeviceConfig, SettingsChange};
pub use device::{Device, DeviceStatus};
pub use discovery::{DiscoveredPanel, discover};
pub use dispatcher::Command;
pub use error::CoreError;
pub use mapper::{StateMapping, map_code};
pub use poller::PollOutcome;
pub use session::{Connection, SessionManager};
pub use sink::{Availability, CapabilitySink};
pub use store::CapabilityStore;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AlarmState, ArmMode, Capability, CapabilityValue, ConditionTarget, DeviceEvent, LocalState,
    StateChange, TimelineEntry, TimelineSeverity,
};
