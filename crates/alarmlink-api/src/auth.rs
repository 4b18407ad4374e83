use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Identifier of a security system on the remote account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemId(String);

impl SystemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authentication material returned by a successful login.
///
/// The token is opaque to callers. `systems` lists every security system
/// the account can see, in the order the service returned them.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    systems: Vec<SystemId>,
}

impl Session {
    pub fn new(token: SecretString, systems: Vec<SystemId>) -> Self {
        Self { token, systems }
    }

    pub(crate) fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn systems(&self) -> &[SystemId] {
        &self.systems
    }

    /// The system this adapter drives. Only the first one is used.
    pub fn primary_system(&self) -> Option<&SystemId> {
        self.systems.first()
    }
}
