//! `alarmlink arm` / `alarmlink disarm`.

use alarmlink_core::{Command as PanelCommand, CoreError, Device};
use secrecy::SecretString;

use crate::cli::{ArmArgs, ArmTarget, DisarmArgs, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

use super::{status, util};

pub async fn arm(resolved: &Resolved, args: ArmArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = match args.mode {
        ArmTarget::Away => PanelCommand::ArmAway,
        ArmTarget::Stay => PanelCommand::ArmStay,
    };
    run(resolved, command, args.pin, global).await
}

pub async fn disarm(
    resolved: &Resolved,
    args: DisarmArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !util::confirm(
        &format!("Disarm '{}'?", resolved.device_id()),
        "disarm",
        global.yes,
    )? {
        eprintln!("Aborted");
        return Ok(());
    }
    run(resolved, PanelCommand::Disarm, args.pin, global).await
}

async fn run(
    resolved: &Resolved,
    command: PanelCommand,
    pin: Option<String>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = resolved.open_device()?;
    let result = send(&device, command, pin.map(SecretString::from)).await;
    let status = device.status();
    device.shutdown().await;
    result?;

    if !global.quiet {
        eprintln!("✓ {command} accepted");
    }
    status::print_status(&status, global);
    Ok(())
}

async fn send(device: &Device, command: PanelCommand, pin: Option<SecretString>) -> Result<(), CoreError> {
    device.connect(false).await?;
    device.execute(command, pin).await
}
