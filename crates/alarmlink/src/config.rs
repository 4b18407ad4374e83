//! Flag-aware profile resolution.
//!
//! File loading and the credential chain live in `alarmlink-config`; this
//! module layers `GlobalOpts` overrides on top and produces everything a
//! command needs to talk to the panel service.

use std::sync::Arc;

use alarmlink_api::{AlarmApi, HttpClient, TransportConfig};
use alarmlink_config::{Config, Profile};
use alarmlink_core::{CapabilitySink, CapabilityStore, CoreError, Device, DeviceConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use alarmlink_config::{config_path, load_config_or_default, save_config};

/// A profile with CLI overrides applied, translated to core/api types.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub base_url: url::Url,
    pub transport: TransportConfig,
    pub device: DeviceConfig,
    /// First partition recorded by `config init`; the profile name stands in
    /// when none was recorded.
    pub partition: Option<String>,
}

impl Resolved {
    pub fn device_id(&self) -> &str {
        self.partition.as_deref().unwrap_or(&self.profile_name)
    }

    pub fn api(&self) -> Result<Arc<HttpClient>, CliError> {
        let client = HttpClient::new(self.base_url.clone(), &self.transport).map_err(CoreError::from)?;
        Ok(Arc::new(client))
    }

    /// A device backed by a fresh HTTP client and an in-memory store.
    pub fn open_device(&self) -> Result<Device, CliError> {
        self.open_device_with(self.device.clone())
    }

    pub fn open_device_with(&self, config: DeviceConfig) -> Result<Device, CliError> {
        let api: Arc<dyn AlarmApi> = self.api()?;
        let sink: Arc<dyn CapabilitySink> = Arc::new(CapabilityStore::new());
        Ok(Device::new(self.device_id(), config, api, sink))
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Apply flag overrides (flag > env > profile) to a copy of the profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

/// Build a [`Resolved`] from the config file, profile, and CLI overrides.
///
/// Without a matching profile the flags alone must name a base URL.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profile(&profile_name) {
        Ok(profile) => profile.clone(),
        Err(_) if global.base_url.is_some() => Profile::default(),
        Err(err) if global.profile.is_some() => return Err(err.into()),
        Err(_) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };
    let profile = apply_overrides(profile, global);

    let base_url = alarmlink_config::profile_base_url(&profile)?;
    let transport = alarmlink_config::profile_transport(&profile, &cfg.defaults);
    let device = alarmlink_config::profile_to_device_config(&profile, &profile_name, &cfg.defaults)?;

    tracing::debug!(profile = %profile_name, url = %base_url, "profile resolved");
    Ok(Resolved {
        profile_name,
        base_url,
        transport,
        device,
        partition: profile.partition,
    })
}
