// ── Session management ──
//
// Owns the single authenticated session a device uses. Login is skipped
// when a session already exists unless the caller forces it; any failed
// login clears whatever session was held.

use std::sync::Arc;

use alarmlink_api::{AlarmApi, Session, SystemId};
use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::CoreError;

/// Outcome of [`SessionManager::connect`].
#[derive(Debug, Clone)]
pub enum Connection {
    /// A session was already held and `force` was not set.
    Existing(Arc<Session>),
    /// A fresh login just succeeded.
    Established(Arc<Session>),
}

impl Connection {
    pub fn session(&self) -> &Arc<Session> {
        match self {
            Self::Existing(s) | Self::Established(s) => s,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Established(_))
    }
}

pub struct SessionManager {
    api: Arc<dyn AlarmApi>,
    current: ArcSwapOption<Session>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AlarmApi>) -> Self {
        Self {
            api,
            current: ArcSwapOption::empty(),
        }
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    /// The held session together with the system it drives.
    pub fn active(&self) -> Option<(Arc<Session>, SystemId)> {
        let session = self.current()?;
        let system = session.primary_system()?.clone();
        Some((session, system))
    }

    pub fn is_connected(&self) -> bool {
        self.active().is_some()
    }

    pub fn invalidate(&self) {
        if self.current.swap(None).is_some() {
            debug!("session cleared");
        }
    }

    /// Ensure a session exists, logging in when there is none or `force`
    /// is set.
    pub async fn connect(
        &self,
        credentials: &Credentials,
        force: bool,
    ) -> Result<Connection, CoreError> {
        if !force {
            if let Some(session) = self.current() {
                return Ok(Connection::Existing(session));
            }
        }

        if !credentials.is_complete() {
            warn!("username or password not configured");
            self.invalidate();
            return Err(CoreError::MissingCredentials);
        }

        info!(username = %credentials.username, force, "logging in");
        let session = match self
            .api
            .login(
                &credentials.username,
                &credentials.password,
                credentials.provider(),
            )
            .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "login failed");
                self.invalidate();
                return Err(login_failure(e));
            }
        };

        if session.systems().is_empty() {
            warn!("login succeeded but the account has no systems");
            self.invalidate();
            return Err(CoreError::NoSystemsFound);
        }

        info!(
            systems = session.systems().len(),
            system = ?session.primary_system(),
            "login successful"
        );
        let session = Arc::new(session);
        self.current.store(Some(Arc::clone(&session)));
        Ok(Connection::Established(session))
    }
}

/// Every login error is an authentication failure from the device's
/// point of view, whatever the transport said.
fn login_failure(err: alarmlink_api::Error) -> CoreError {
    match err {
        alarmlink_api::Error::Authentication { message } => {
            CoreError::AuthenticationFailed { message }
        }
        other => CoreError::AuthenticationFailed {
            message: other.to_string(),
        },
    }
}
