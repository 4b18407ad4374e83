//! `alarmlink status`: one login, one state fetch.

use std::fmt::Display;

use alarmlink_core::DeviceStatus;

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let device = resolved.open_device()?;
    let connected = device.connect(false).await;
    let status = device.status();
    device.shutdown().await;
    connected?;

    print_status(&status, global);
    Ok(())
}

pub fn print_status(status: &DeviceStatus, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        status,
        |s| detail(s, color),
        |s| or_dash(s.state),
    );
    output::print_output(&out, global.quiet);
}

fn detail(s: &DeviceStatus, color: bool) -> String {
    [
        format!("Partition: {}", s.id),
        format!(
            "State:     {}",
            s.state
                .map_or_else(|| "-".into(), |state| output::paint_state(state, color))
        ),
        format!("Alarm:     {}", or_dash(s.homealarm_state)),
        format!("Mode:      {}", or_dash(s.arm_mode)),
        format!(
            "Armed:     {}",
            s.onoff.map_or("-", |on| if on { "yes" } else { "no" })
        ),
        format!(
            "Service:   {}",
            output::paint_availability(&s.availability, color)
        ),
        format!(
            "Changed:   {}",
            s.last_changed.map_or_else(|| "-".into(), |t| t.to_rfc3339())
        ),
    ]
    .join("\n")
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}
