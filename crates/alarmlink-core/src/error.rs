// ── Core error types ──
//
// Device-level errors from alarmlink-core. Consumers see why a device is
// unusable or why a command was refused, not raw HTTP details. The
// `From<alarmlink_api::Error>` impl translates transport-layer errors.

use thiserror::Error;

use crate::dispatcher::Command;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("No systems found")]
    NoSystemsFound,

    #[error("Not connected")]
    NotConnected,

    #[error("Initial state fetch failed: {message}")]
    InitialStateFailed { message: String },

    #[error("Cannot reach panel service: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Panel service timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    /// The remote service refused or failed an arm/disarm request. The
    /// underlying API error is kept intact as the source.
    #[error("{command} failed: {source}")]
    ActionFailed {
        command: Command,
        #[source]
        source: alarmlink_api::Error,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Reason string shown by the host while the device is unavailable.
    pub fn unavailable_reason(&self) -> String {
        match self {
            Self::MissingCredentials => "Missing credentials".into(),
            Self::NoSystemsFound => "Login failed: No systems found".into(),
            Self::AuthenticationFailed { message } => format!("Login failed: {message}"),
            Self::InitialStateFailed { message } => format!("Connect failed: {message}"),
            other => format!("Login failed: {other}"),
        }
    }

    /// Returns `true` for errors that a forced reconnect could fix.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } => true,
            Self::ActionFailed { source, .. } => source.is_auth_failure(),
            Self::Api { status, .. } => matches!(status, Some(401 | 403)),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<alarmlink_api::Error> for CoreError {
    fn from(err: alarmlink_api::Error) -> Self {
        match err {
            alarmlink_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            alarmlink_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            alarmlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            alarmlink_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            alarmlink_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            alarmlink_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
