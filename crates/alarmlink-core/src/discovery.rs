// ── Panel discovery ──
//
// Lists the partitions an account can see so a host can offer them as
// devices to add.

use alarmlink_api::{AlarmApi, SystemId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::CoreError;

/// A partition offered as a candidate device.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredPanel {
    pub name: String,
    pub id: String,
    pub system_id: SystemId,
    #[serde(skip)]
    pub credentials: Credentials,
}

/// Log in with `credentials` and list every partition of the account's
/// first system.
pub async fn discover(
    api: &dyn AlarmApi,
    credentials: &Credentials,
) -> Result<Vec<DiscoveredPanel>, CoreError> {
    if !credentials.is_complete() {
        return Err(CoreError::MissingCredentials);
    }

    let session = api
        .login(
            &credentials.username,
            &credentials.password,
            credentials.provider(),
        )
        .await
        .map_err(|e| match e {
            alarmlink_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            other => CoreError::from(other),
        })?;

    let Some(system) = session.primary_system().cloned() else {
        return Err(CoreError::NoSystemsFound);
    };

    let state = api.get_state(&system, &session).await?;
    debug!(system = %system, partitions = state.partitions.len(), "state fetched for discovery");

    let panels: Vec<DiscoveredPanel> = state
        .partitions
        .into_iter()
        .map(|partition| DiscoveredPanel {
            name: partition
                .attributes
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Partition {}", partition.id)),
            id: partition.id,
            system_id: system.clone(),
            credentials: credentials.clone(),
        })
        .collect();

    info!(count = panels.len(), "discovery complete");
    Ok(panels)
}
