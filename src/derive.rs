//! Magnitude-derived presentation values.
//!
//! Pure functions that turn a magnitude into a marker color and size, a
//! timestamp into display text, and a snapshot into summary statistics.

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::models::FeedSnapshot;

/// Seven magnitude buckets, lower bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeClass {
    /// 7.0 and above
    Major,
    /// 6.0 - 7.0
    Strong,
    /// 5.0 - 6.0
    Moderate,
    /// 4.0 - 5.0
    Light,
    /// 3.0 - 4.0
    Minor,
    /// 2.0 - 3.0
    VeryMinor,
    /// Below 2.0
    Micro,
}

impl MagnitudeClass {
    /// Every bucket, strongest first.
    pub const ALL: [Self; 7] = [
        Self::Major,
        Self::Strong,
        Self::Moderate,
        Self::Light,
        Self::Minor,
        Self::VeryMinor,
        Self::Micro,
    ];

    /// Classify a magnitude. Total over all reals; NaN falls to `Micro`.
    #[must_use]
    pub fn of(magnitude: f64) -> Self {
        match magnitude {
            m if m >= 7.0 => Self::Major,
            m if m >= 6.0 => Self::Strong,
            m if m >= 5.0 => Self::Moderate,
            m if m >= 4.0 => Self::Light,
            m if m >= 3.0 => Self::Minor,
            m if m >= 2.0 => Self::VeryMinor,
            _ => Self::Micro,
        }
    }

    /// Fill color used on the map and in the legend.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Major => "#dc2626",
            Self::Strong => "#ea580c",
            Self::Moderate => "#d97706",
            Self::Light => "#ca8a04",
            Self::Minor => "#65a30d",
            Self::VeryMinor => "#16a34a",
            Self::Micro => "#059669",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Strong => "Strong",
            Self::Moderate => "Moderate",
            Self::Light => "Light",
            Self::Minor => "Minor",
            Self::VeryMinor => "Very Minor",
            Self::Micro => "Micro",
        }
    }

    /// Legend range text.
    #[must_use]
    pub const fn range(self) -> &'static str {
        match self {
            Self::Major => "7+",
            Self::Strong => "6-7",
            Self::Moderate => "5-6",
            Self::Light => "4-5",
            Self::Minor => "3-4",
            Self::VeryMinor => "2-3",
            Self::Micro => "<2",
        }
    }
}

/// Marker fill color for a magnitude.
#[must_use]
pub fn color_for_magnitude(magnitude: f64) -> &'static str {
    MagnitudeClass::of(magnitude).color()
}

/// Base marker size for a magnitude: `magnitude * 3` clamped to [4, 20].
#[must_use]
pub fn size_for_magnitude(magnitude: f64) -> f64 {
    // f64::clamp propagates NaN, so route it to the lower bound explicitly.
    if magnitude.is_nan() {
        return MIN_SIZE;
    }
    (magnitude * 3.0).clamp(MIN_SIZE, MAX_SIZE)
}

const MIN_SIZE: f64 = 4.0;
const MAX_SIZE: f64 = 20.0;

/// Display format for timestamps, close to a US-locale `toLocaleString`.
const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Render an epoch-millisecond timestamp in the viewer's local time zone.
#[must_use]
pub fn format_timestamp(epoch_millis: i64) -> String {
    format_timestamp_in(epoch_millis, &Local)
}

/// Render an epoch-millisecond timestamp in a given time zone.
#[must_use]
pub fn format_timestamp_in<Tz>(epoch_millis: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_millis_opt(epoch_millis)
        .single()
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "Invalid Date".into())
}

/// Summary statistics over an unfiltered snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedStats {
    /// Every event, magnitude or not
    pub total: usize,
    /// `None` when no event carries a magnitude
    pub max_magnitude: Option<f64>,
    /// One decimal place; `None` when no event carries a magnitude
    pub avg_magnitude: Option<String>,
}

/// Compute summary statistics; `None` when no snapshot has loaded yet.
#[must_use]
pub fn compute_stats(snapshot: Option<&FeedSnapshot>) -> Option<FeedStats> {
    let snapshot = snapshot?;

    let magnitudes: Vec<f64> = snapshot.events.iter().filter_map(|e| e.magnitude).collect();

    let max_magnitude = magnitudes.iter().copied().reduce(f64::max);
    let avg_magnitude = if magnitudes.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let avg = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
        // Ties round away from zero, unlike `{:.1}` on its own.
        Some(format!("{:.1}", (avg * 10.0).round() / 10.0))
    };

    Some(FeedStats {
        total: snapshot.len(),
        max_magnitude,
        avg_magnitude,
    })
}

/// Zoom level the marker scale is anchored at.
const BASE_ZOOM: f64 = 2.0;

/// Zoom-responsive scale factor: `1.8^(zoom - 2)` clamped to [0.3, 8].
#[must_use]
pub fn zoom_scale(zoom: f64) -> f64 {
    1.8_f64.powf(zoom - BASE_ZOOM).clamp(0.3, 8.0)
}

/// Rendered marker radius for a base size at a zoom level, in [3, 60].
#[must_use]
pub fn marker_radius(base_size: f64, zoom: f64) -> f64 {
    (base_size / 2.5 * zoom_scale(zoom)).clamp(3.0, 60.0)
}

/// Marker border weight at a zoom level, never below 1.
#[must_use]
pub fn border_weight(zoom: f64) -> f64 {
    (2.5 * (zoom_scale(zoom) * 0.6).clamp(0.8, 3.0)).max(1.0)
}
