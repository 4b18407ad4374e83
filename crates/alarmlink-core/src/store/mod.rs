// ── In-memory capability store ──
//
// Lock-free `CapabilitySink` used by the CLI and by tests. Values live in
// a `DashMap`; availability and a write counter are published through
// `watch` channels so consumers can react without polling.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Capability, CapabilityValue};
use crate::sink::{Availability, CapabilitySink};

/// Reactive in-memory [`CapabilitySink`].
pub struct CapabilityStore {
    values: DashMap<Capability, CapabilityValue>,
    availability: watch::Sender<Availability>,
    /// Bumped on every `set`, including writes of an identical value.
    writes: watch::Sender<u64>,
}

impl CapabilityStore {
    pub fn new() -> Self {
        let (availability, _) = watch::channel(Availability::Unknown);
        let (writes, _) = watch::channel(0);
        Self {
            values: DashMap::new(),
            availability,
            writes,
        }
    }

    pub fn availability(&self) -> Availability {
        self.availability.borrow().clone()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    /// Total number of capability writes so far.
    pub fn write_count(&self) -> u64 {
        *self.writes.borrow()
    }

    pub fn subscribe_writes(&self) -> watch::Receiver<u64> {
        self.writes.subscribe()
    }

    pub fn snapshot(&self) -> HashMap<Capability, CapabilityValue> {
        self.values
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}

impl Default for CapabilityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilitySink for CapabilityStore {
    fn get(&self, capability: Capability) -> Option<CapabilityValue> {
        self.values.get(&capability).map(|v| *v)
    }

    fn set(&self, capability: Capability, value: CapabilityValue) -> Result<(), CoreError> {
        debug!(%capability, ?value, "capability updated");
        self.values.insert(capability, value);
        self.writes.send_modify(|n| *n += 1);
        Ok(())
    }

    fn set_available(&self) {
        self.availability.send_if_modified(|current| {
            if current.is_available() {
                false
            } else {
                *current = Availability::Available;
                true
            }
        });
    }

    fn set_unavailable(&self, reason: &str) {
        self.availability.send_replace(Availability::Unavailable {
            reason: reason.to_owned(),
        });
    }
}
