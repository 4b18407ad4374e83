//! Command dispatch: bridges CLI args -> core device operations -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod discover;
pub mod status;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a panel-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(resolved, global).await,
        Command::Arm(args) => control::arm(resolved, args, global).await,
        Command::Disarm(args) => control::disarm(resolved, args, global).await,
        Command::Watch(args) => watch::handle(resolved, args, global).await,
        Command::Discover => discover::handle(resolved, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
