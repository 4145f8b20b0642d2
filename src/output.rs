//! Output formatters for earthquake events.
//!
//! Terminal output (human with colors, JSON, NDJSON) for the CLI, plus the
//! popup markup and detail-panel content shown by the dashboard.

use std::io::{self, Write};

use serde::Serialize;

use crate::derive::{FeedStats, MagnitudeClass, format_timestamp};
use crate::models::{AlertLevel, EarthquakeEvent, OutputEvent};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Alert level colors
const ALERT_GREEN: &str = "\x1b[42;30m";
const ALERT_YELLOW: &str = "\x1b[43;30m";
const ALERT_ORANGE: &str = "\x1b[48;5;208;30m";
const ALERT_RED: &str = "\x1b[41;97m";

const ICON_QUAKE: &str = "🌍";
const ICON_TSUNAMI: &str = "🌊";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// 256-color ANSI foreground matching each bucket's map color.
fn ansi_color(class: MagnitudeClass) -> &'static str {
    match class {
        MagnitudeClass::Major => "\x1b[38;5;160m",
        MagnitudeClass::Strong => "\x1b[38;5;166m",
        MagnitudeClass::Moderate => "\x1b[38;5;172m",
        MagnitudeClass::Light => "\x1b[38;5;178m",
        MagnitudeClass::Minor => "\x1b[38;5;106m",
        MagnitudeClass::VeryMinor => "\x1b[38;5;34m",
        MagnitudeClass::Micro => "\x1b[38;5;36m",
    }
}

/// Format alert level with color.
fn format_alert(alert: Option<AlertLevel>) -> String {
    match alert {
        Some(AlertLevel::Red) => format!(" {ALERT_RED} RED {RESET}"),
        Some(AlertLevel::Orange) => format!(" {ALERT_ORANGE} ORANGE {RESET}"),
        Some(AlertLevel::Yellow) => format!(" {ALERT_YELLOW} YELLOW {RESET}"),
        Some(AlertLevel::Green) => format!(" {ALERT_GREEN} GREEN {RESET}"),
        Some(AlertLevel::Unknown) | None => String::new(),
    }
}

/// Write events in human-readable format, colored by magnitude bucket.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[&EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let time = format_timestamp(event.occurred_at);

        let mag_str = event
            .magnitude
            .map_or_else(|| "?".into(), |m| format!("{m:.1}"));
        let mag_type = event.magnitude_type.as_deref().unwrap_or("?");
        let depth = event
            .coordinates
            .map_or_else(|| "    ?".into(), |c| format!("{:>5.0}", c.depth_km));

        let class = MagnitudeClass::of(event.magnitude.unwrap_or(0.0));
        let color = ansi_color(class);
        let label = class.label();
        let alert = format_alert(event.alert);
        let tsunami = if event.tsunami {
            format!(" {ICON_TSUNAMI}")
        } else {
            String::new()
        };

        writeln!(
            writer,
            "{ICON_QUAKE} {color}{BOLD}M{mag_str}{RESET} {DIM}{mag_type}{RESET} │ \
             {color}{label:10}{RESET} │ \
             {DIM}{depth}km{RESET} │ \
             {time} │ \
             {place}{tsunami}{alert}",
            place = event.place(),
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[&EarthquakeEvent]) -> io::Result<()> {
    let output: Vec<OutputEvent> = events.iter().map(|e| OutputEvent::from(*e)).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[&EarthquakeEvent]) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(&OutputEvent::from(*event))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[&EarthquakeEvent],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}

/// Write summary statistics.
///
/// NDJSON and JSON both emit a single object.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_stats<W: Write>(writer: &mut W, stats: &FeedStats, format: Format) -> io::Result<()> {
    match format {
        Format::Human => {
            let max = stats
                .max_magnitude
                .map_or_else(|| "-".into(), |m| format!("{m:.1}"));
            let avg = stats.avg_magnitude.as_deref().unwrap_or("-");
            writeln!(writer, "{BOLD}Events{RESET}   {}", stats.total)?;
            writeln!(writer, "{BOLD}Max Mag{RESET}  {max}")?;
            writeln!(writer, "{BOLD}Avg Mag{RESET}  {avg}")
        }
        Format::Json | Format::Ndjson => {
            let json = serde_json::to_string(stats)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{json}")
        }
    }
}

/// Escape text for inclusion in HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Info popup shown on the map when a marker is clicked.
#[must_use]
pub fn popup_html(event: &EarthquakeEvent) -> String {
    let mut html = format!(
        r#"<div class="quake-popup"><h3>{title}</h3>"#,
        title = escape_html(&event.title())
    );

    let magnitude = event
        .magnitude
        .map_or_else(|| "unknown".into(), |m| format!("{m:.1}"));
    html.push_str(&format!("<p><b>Magnitude:</b> {magnitude}</p>"));

    if let Some(c) = event.coordinates {
        html.push_str(&format!("<p><b>Depth:</b> {:.1} km</p>", c.depth_km));
    }
    html.push_str(&format!(
        "<p><b>Time:</b> {}</p>",
        escape_html(&format_timestamp(event.occurred_at))
    ));
    if let Some(c) = event.coordinates {
        html.push_str(&format!(
            "<p><b>Coordinates:</b> {:.3}°, {:.3}°</p>",
            c.latitude, c.longitude
        ));
    }
    html.push_str(&format!("<p><b>Location:</b> {}</p>", escape_html(event.place())));

    if event.tsunami {
        html.push_str(r#"<p class="tsunami">Tsunami Warning!</p>"#);
    }
    if let Some(alert) = event.alert {
        html.push_str(&format!(
            r#"<p class="alert alert-{level}">Alert Level: {upper}</p>"#,
            level = alert.as_str(),
            upper = alert.as_str().to_uppercase()
        ));
    }
    if let Some(url) = &event.detail_url {
        html.push_str(&format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">View USGS Details</a>"#,
            escape_html(url)
        ));
    }
    html.push_str("</div>");
    html
}

/// Content of the detail panel for the selected earthquake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    pub id: String,
    pub title: String,
    pub magnitude: Option<f64>,
    pub place: String,
    pub time: String,
    pub tsunami_warning: bool,
    /// Upper-cased alert level, if one was issued
    pub alert_level: Option<String>,
    pub url: Option<String>,
}

impl From<&EarthquakeEvent> for EventDetail {
    fn from(e: &EarthquakeEvent) -> Self {
        Self {
            id: e.id.clone(),
            title: e.title(),
            magnitude: e.magnitude,
            place: e.place().to_string(),
            time: format_timestamp(e.occurred_at),
            tsunami_warning: e.tsunami,
            alert_level: e.alert.map(|a| a.as_str().to_uppercase()),
            url: e.detail_url.clone(),
        }
    }
}
