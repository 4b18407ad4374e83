//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use alarmlink_core::{Availability, LocalState};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Armed states in red, disarmed in green.
pub fn paint_state(state: LocalState, color: bool) -> String {
    let label: &'static str = state.into();
    if !color {
        return label.to_string();
    }
    if state.is_armed() {
        label.red().bold().to_string()
    } else {
        label.green().to_string()
    }
}

pub fn paint_availability(availability: &Availability, color: bool) -> String {
    let label = match availability {
        Availability::Unknown => "unknown".to_string(),
        Availability::Available => "available".to_string(),
        Availability::Unavailable { reason } => format!("unavailable ({reason})"),
    };
    match (color, availability) {
        (false, _) | (true, Availability::Unknown) => label,
        (true, Availability::Available) => label.green().to_string(),
        (true, Availability::Unavailable { .. }) => label.yellow().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted string,
/// since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Render one item of a stream. Structured formats stay one document per
/// line so the output can be piped into line-oriented tools; `line_fn`
/// may skip items in the human-readable formats.
pub fn render_stream_item<T>(
    format: &OutputFormat,
    data: &T,
    line_fn: impl Fn(&T) -> Option<String>,
) -> Option<String>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table | OutputFormat::Plain => line_fn(data),
        OutputFormat::Json | OutputFormat::JsonCompact => Some(render_json(data, true)),
        OutputFormat::Yaml => Some(format!("---\n{}", render_yaml(data).trim_end())),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        serde_json::to_string(data).expect("serialization should not fail")
    } else {
        serde_json::to_string_pretty(data).expect("serialization should not fail")
    }
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::{OutputFormat, paint_availability, paint_state, render_stream_item};
    use alarmlink_core::{Availability, LocalState};

    #[test]
    fn uncolored_labels_are_plain() {
        assert_eq!(paint_state(LocalState::ArmedNight, false), "armed_night");
        assert_eq!(
            paint_availability(&Availability::Unavailable { reason: "Missing credentials".into() }, false),
            "unavailable (Missing credentials)"
        );
    }

    #[test]
    fn stream_json_is_single_line() {
        let value = serde_json::json!({"a": [1, 2]});
        let out = render_stream_item(&OutputFormat::Json, &value, |_| None);
        assert_eq!(out.as_deref(), Some(r#"{"a":[1,2]}"#));
        assert_eq!(render_stream_item(&OutputFormat::Plain, &value, |_| None), None);
    }
}
