//! `alarmlink discover`: list the partitions the account can drive.

use alarmlink_core::DiscoveredPanel;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PanelRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "System")]
    system: String,
}

fn row(p: &DiscoveredPanel) -> PanelRow {
    PanelRow {
        id: p.id.clone(),
        name: p.name.clone(),
        system: p.system_id.to_string(),
    }
}

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let api = resolved.api()?;
    let panels = alarmlink_core::discover(api.as_ref(), &resolved.device.credentials).await?;

    let out = output::render_list(&global.output, &panels, row, |p| p.id.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
