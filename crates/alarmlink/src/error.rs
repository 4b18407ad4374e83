//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use alarmlink_config::ConfigError;
use alarmlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the panel service: {reason}")]
    #[diagnostic(
        code(alarmlink::connection_failed),
        help(
            "Check the base_url of your profile and your network connection.\n\
             Try: alarmlink status -vv"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Not connected to the panel service")]
    #[diagnostic(
        code(alarmlink::not_connected),
        help("The session was dropped before the command ran. Retry the command.")
    )]
    NotConnected,

    #[error("Panel is unavailable: {reason}")]
    #[diagnostic(code(alarmlink::unavailable))]
    Unavailable { reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(alarmlink::timeout),
        help("Increase timeout with --timeout or check the service status.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(alarmlink::auth_failed),
        help(
            "Verify your username and password.\n\
             Run: alarmlink config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(alarmlink::no_credentials),
        help(
            "Configure credentials with: alarmlink config init\n\
             Or set the ALARMLINK_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("The account has no security systems")]
    #[diagnostic(
        code(alarmlink::no_systems),
        help("Log in to the provider's web portal and check the account owns a panel.")
    )]
    NoSystems,

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{command} was rejected: {message}")]
    #[diagnostic(
        code(alarmlink::command_rejected),
        help("Check for open zones and that the PIN is correct.")
    )]
    CommandRejected { command: String, message: String },

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(alarmlink::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(alarmlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(alarmlink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: alarmlink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(alarmlink::no_config),
        help(
            "Create one with: alarmlink config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(alarmlink::config))]
    Config { message: String },

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(alarmlink::keyring),
        help("Store the secret in the profile or an environment variable instead.")
    )]
    Keyring { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(alarmlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected | Self::Unavailable { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NoSystems => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

fn join_available(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingCredentials => CliError::NoCredentials {
                profile: "current".into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::NoSystemsFound => CliError::NoSystems,

            CoreError::NotConnected => CliError::NotConnected,

            CoreError::InitialStateFailed { message } => CliError::Unavailable { reason: message },

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout => CliError::Timeout,

            CoreError::ActionFailed { command, source } => CliError::CommandRejected {
                command: command.to_string(),
                message: source.to_string(),
            },

            CoreError::Api { message, status } => CliError::ApiError {
                code: status.map_or_else(|| "unknown".into(), |s| s.to_string()),
                message,
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: join_available(&available),
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                message: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, exit_code};
    use alarmlink_config::ConfigError;
    use alarmlink_core::{Command, CoreError};

    #[test]
    fn auth_problems_exit_with_auth_code() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad password".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(CliError::from(CoreError::MissingCredentials).exit_code(), exit_code::AUTH);
    }

    #[test]
    fn lost_session_exits_with_connection_code() {
        assert_eq!(CliError::from(CoreError::NotConnected).exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn rejected_command_keeps_remote_message() {
        let err = CliError::from(CoreError::ActionFailed {
            command: Command::Disarm,
            source: alarmlink_api::Error::Api {
                status: 409,
                message: "zone 3 open".into(),
            },
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert!(err.to_string().contains("zone 3 open"));
    }

    #[test]
    fn missing_profile_lists_alternatives() {
        let err = CliError::from(ConfigError::ProfileNotFound {
            name: "office".into(),
            available: vec![],
        });
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "(none)"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
