//! Async client for hosted security-panel APIs.
//!
//! - **[`AlarmApi`]**: the capability trait consumed by `alarmlink-core`:
//!   `login`, `get_state`, `arm_away`, `arm_stay`, `disarm`.
//! - **[`HttpClient`]**: `reqwest`-backed implementation speaking the JSON
//!   panel API (token auth, per-system state and arm endpoints).
//! - **[`Session`]** / **[`SystemId`]**: authentication material returned
//!   by login, passed back on every call.
//! - **[`SystemState`]**: raw per-partition state snapshot.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{Session, SystemId};
pub use client::{AlarmApi, HttpClient};
pub use error::Error;
pub use models::{Partition, PartitionAttributes, SystemState};
pub use transport::{TlsMode, TransportConfig};
