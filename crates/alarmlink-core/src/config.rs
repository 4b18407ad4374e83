// ── Device configuration ──
//
// Describes how a `Device` authenticates and how often it polls.
// Built by the CLI (or any other host) from profile settings; the core
// crate never reads files or the environment itself.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Default interval between background polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Delay before the second re-poll that follows a successful command.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(3);

/// Consecutive non-auth poll failures before the device is marked
/// unavailable. Zero disables the check.
pub const DEFAULT_UNAVAILABLE_AFTER_FAILURES: u32 = 5;

/// Login material for the panel service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// PIN used for commands when the caller supplies none.
    pub default_pin: Option<SecretString>,
    /// Service provider hint passed through to login. Empty means none.
    pub provider: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            default_pin: None,
            provider: String::new(),
        }
    }

    /// Both username and password are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.expose_secret().is_empty()
    }

    pub fn provider(&self) -> Option<&str> {
        Some(self.provider.as_str()).filter(|p| !p.is_empty())
    }

    /// Whether a login with `other` would differ from a login with `self`.
    fn login_differs(&self, other: &Self) -> bool {
        self.username != other.username
            || self.password.expose_secret() != other.password.expose_secret()
            || self.provider != other.provider
    }

    fn pin_differs(&self, other: &Self) -> bool {
        self.default_pin.as_ref().map(|p| p.expose_secret())
            != other.default_pin.as_ref().map(|p| p.expose_secret())
    }
}

/// Configuration for one alarm device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub credentials: Credentials,
    /// Background poll period. Zero falls back to the default.
    pub poll_interval: Duration,
    pub refresh_delay: Duration,
    pub unavailable_after_failures: u32,
}

impl DeviceConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_delay: DEFAULT_REFRESH_DELAY,
            unavailable_after_failures: DEFAULT_UNAVAILABLE_AFTER_FAILURES,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn effective_poll_interval(&self) -> Duration {
        if self.poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.poll_interval
        }
    }
}

/// Which settings differ between two configurations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// Username, password, or provider changed; a forced login is needed.
    pub credentials: bool,
    pub poll_interval: bool,
    pub default_pin: bool,
}

impl SettingsChange {
    pub fn between(old: &DeviceConfig, new: &DeviceConfig) -> Self {
        Self {
            credentials: old.credentials.login_differs(&new.credentials),
            poll_interval: old.effective_poll_interval() != new.effective_poll_interval(),
            default_pin: old.credentials.pin_differs(&new.credentials),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::{Credentials, DEFAULT_POLL_INTERVAL, DeviceConfig, SettingsChange};

    fn config(user: &str, password: &str) -> DeviceConfig {
        DeviceConfig::new(Credentials::new(user, SecretString::from(password.to_string())))
    }

    #[test]
    fn incomplete_credentials_are_detected() {
        assert!(config("a", "b").credentials.is_complete());
        assert!(!config("", "b").credentials.is_complete());
        assert!(!config("a", "").credentials.is_complete());
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let cfg = config("a", "b").with_poll_interval(Duration::ZERO);
        assert_eq!(cfg.effective_poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn settings_change_detects_each_kind() {
        let old = config("a", "b");

        let mut new = old.clone();
        new.credentials.password = SecretString::from("c".to_string());
        assert_eq!(
            SettingsChange::between(&old, &new),
            SettingsChange {
                credentials: true,
                ..SettingsChange::default()
            }
        );

        let new = old.clone().with_poll_interval(Duration::from_secs(30));
        assert!(SettingsChange::between(&old, &new).poll_interval);

        let mut new = old.clone();
        new.credentials.default_pin = Some(SecretString::from("1234".to_string()));
        let change = SettingsChange::between(&old, &new);
        assert!(change.default_pin && !change.credentials);

        assert!(SettingsChange::between(&old, &old.clone()).is_empty());
    }

    #[test]
    fn empty_provider_is_none() {
        let mut creds = Credentials::new("a", SecretString::from("b".to_string()));
        assert_eq!(creds.provider(), None);
        creds.provider = "alarm.com".into();
        assert_eq!(creds.provider(), Some("alarm.com"));
    }
}
