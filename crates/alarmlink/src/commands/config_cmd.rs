//! Config subcommand handlers.

use alarmlink_api::HttpClient;
use alarmlink_config::{Config, Defaults, Profile};
use alarmlink_core::{Credentials, DiscoveredPanel};
use dialoguer::{Input, Select};
use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

fn not_found(cfg: &Config, name: String) -> CliError {
    CliError::from(alarmlink_config::ConfigError::ProfileNotFound {
        name,
        available: cfg.profile_names(),
    })
}

/// Ask whether a secret goes to the keyring; `true` means keyring.
fn keyring_choice(what: &str) -> Result<bool, CliError> {
    let choices = &[
        format!("Store {what} in system keyring (recommended)"),
        "Save to config file (plaintext)".to_string(),
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {what}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(selection == 0)
}

fn prompt_secret(label: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

/// Log in with the new profile and list its partitions.
async fn discover_partitions(
    profile: &Profile,
    password: &str,
) -> Result<Vec<DiscoveredPanel>, CliError> {
    let base_url = alarmlink_config::profile_base_url(profile)?;
    let transport = alarmlink_config::profile_transport(profile, &Defaults::default());
    let api = HttpClient::new(base_url, &transport).map_err(alarmlink_core::CoreError::from)?;

    let mut credentials = Credentials::new(
        profile.username.clone(),
        SecretString::from(password.to_string()),
    );
    credentials.provider.clone_from(&profile.provider);

    Ok(alarmlink_core::discover(&api, &credentials).await?)
}

/// The partition the device follows. Polling always reads the first
/// partition of the system, so that is the one recorded.
fn first_partition(panels: &[DiscoveredPanel]) -> Option<&DiscoveredPanel> {
    let (first, rest) = panels.split_first()?;
    eprintln!("   ✓ Following partition '{}'", first.name);
    if !rest.is_empty() {
        eprintln!(
            "   ! {} more partition(s) found; only the first one is monitored",
            rest.len()
        );
    }
    Some(first)
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("alarmlink configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. Service
            let base_url: String = Input::new()
                .with_prompt("Panel service URL")
                .interact_text()
                .map_err(prompt_err)?;

            let provider: String = Input::new()
                .with_prompt("Provider (leave empty for none)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            // 3. Account
            let username: String = Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?;
            let password = prompt_secret("Password: ")?;

            let password_field = if keyring_choice("password")? {
                alarmlink_config::store_password(&profile_name, &password)?;
                eprintln!("   ✓ Password stored in system keyring");
                None
            } else {
                Some(password.clone())
            };

            // 4. Optional default PIN
            let pin = rpassword::prompt_password("Default PIN (leave empty for none): ")
                .map_err(prompt_err)?;
            let pin_field = if pin.is_empty() {
                None
            } else if keyring_choice("PIN")? {
                alarmlink_config::store_pin(&profile_name, &pin)?;
                eprintln!("   ✓ PIN stored in system keyring");
                None
            } else {
                Some(pin)
            };

            let mut profile = Profile {
                base_url,
                provider,
                username,
                password: password_field,
                default_pin: pin_field,
                insecure: global.insecure.then_some(true),
                ..Profile::default()
            };

            // 5. Partition, when the account can be reached
            match discover_partitions(&profile, &password).await {
                Ok(panels) => profile.partition = first_partition(&panels).map(|p| p.id.clone()),
                Err(e) => eprintln!("   ! Could not list partitions ({e}); continuing without one"),
            }

            // 6. Write config
            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            let path = config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Profile: {profile_name}");
            eprintln!("\n  Test it: alarmlink status --profile {profile_name}");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.profiles.values_mut() {
                if profile.password.is_some() {
                    profile.password = Some(REDACTED.into());
                }
                if profile.default_pin.is_some() {
                    profile.default_pin = Some(REDACTED.into());
                }
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            let parse_u64 = |field: &str, value: &str| {
                value.parse::<u64>().map_err(|_| CliError::Validation {
                    field: field.into(),
                    reason: "must be a number (seconds)".into(),
                })
            };

            match key.as_str() {
                "base_url" | "base-url" => profile.base_url = value,
                "provider" => profile.provider = value,
                "username" => profile.username = value,
                "password_env" | "password-env" => profile.password_env = Some(value),
                "poll_interval" | "poll-interval" => {
                    profile.poll_interval = Some(parse_u64("poll_interval", &value)?);
                }
                "timeout" => profile.timeout = Some(parse_u64("timeout", &value)?),
                "insecure" => {
                    profile.insecure = Some(value.parse().map_err(|_| CliError::Validation {
                        field: "insecure".into(),
                        reason: "must be 'true' or 'false'".into(),
                    })?);
                }
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: base_url, provider, \
                             username, password_env, poll_interval, timeout, \
                             insecure, ca_cert"
                        ),
                    });
                }
            }

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: alarmlink config init");
            } else {
                for name in cfg.profile_names() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(not_found(&cfg, name));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── Keyring secrets ─────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let profile_name = existing_profile(profile, global)?;
            let secret = prompt_secret("Password: ")?;
            alarmlink_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
        ConfigCommand::SetPin { profile } => {
            let profile_name = existing_profile(profile, global)?;
            let secret = prompt_secret("PIN: ")?;
            alarmlink_config::store_pin(&profile_name, &secret)?;
            eprintln!("✓ PIN stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

/// The named (or active) profile, which must already exist.
fn existing_profile(name: Option<String>, global: &GlobalOpts) -> Result<String, CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = name.unwrap_or_else(|| config::active_profile_name(global, &cfg));
    if cfg.profiles.contains_key(&profile_name) {
        Ok(profile_name)
    } else {
        Err(not_found(&cfg, profile_name))
    }
}
