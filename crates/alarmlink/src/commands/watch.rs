//! `alarmlink watch`: poll in the background and stream what changes.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use alarmlink_core::{Availability, DeviceEvent};
use chrono::Local;
use futures_util::{StreamExt, future::ready, stream};
use serde::Serialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tracing::warn;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

/// One line of watch output.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Update {
    Event(Arc<DeviceEvent>),
    Availability { availability: Availability },
}

impl Update {
    fn is_state_change(&self) -> bool {
        matches!(self, Self::Event(event) if matches!(**event, DeviceEvent::StateChanged(_)))
    }
}

pub async fn handle(resolved: &Resolved, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = resolved.device.clone();
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        config = config.with_poll_interval(Duration::from_secs(secs));
    }
    let period = config.effective_poll_interval();
    let device = resolved.open_device_with(config)?;

    // Subscribe before starting so the seeding state change is not missed.
    let events = BroadcastStream::new(device.subscribe()).filter_map(|item| {
        ready(match item {
            Ok(event) => Some(Update::Event(event)),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "watch fell behind, events dropped");
                None
            }
        })
    });
    let availability =
        WatchStream::new(device.availability()).map(|availability| Update::Availability { availability });
    let mut updates = pin!(stream::select(events, availability));

    if let Err(e) = device.start().await {
        if !device.is_connected() {
            device.shutdown().await;
            return Err(e.into());
        }
    }
    if !global.quiet {
        eprintln!(
            "Watching '{}' every {}s (Ctrl-C to stop)",
            device.id(),
            period.as_secs()
        );
    }

    let color = output::should_color(&global.color);
    let mut ctrl_c = pin!(tokio::signal::ctrl_c());
    let mut changes = 0usize;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            update = updates.next() => {
                let Some(update) = update else { break };
                if let Some(out) = output::render_stream_item(&global.output, &update, |u| line(u, device.id(), color)) {
                    output::print_output(&out, global.quiet);
                }
                if update.is_state_change() {
                    changes += 1;
                    if args.count.is_some_and(|limit| changes >= limit) {
                        break;
                    }
                }
            }
        }
    }

    device.shutdown().await;
    Ok(())
}

fn line(update: &Update, id: &str, color: bool) -> Option<String> {
    let now = Local::now().format("%H:%M:%S");
    match update {
        Update::Event(event) => match event.as_ref() {
            DeviceEvent::StateChanged(change) => Some(format!(
                "{now}  {id}  {} -> {} (raw {})",
                change.previous_label(),
                output::paint_state(change.state, color),
                change.raw_state
            )),
            DeviceEvent::Timeline(_) => None,
        },
        Update::Availability { availability } => Some(format!(
            "{now}  {id}  service {}",
            output::paint_availability(availability, color)
        )),
    }
}
