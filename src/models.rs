//! Data models for the USGS earthquake feed.
//!
//! The wire types mirror the GeoJSON summary feed and are deliberately
//! lenient: the feed publishes `null` for many properties. They are turned
//! into immutable [`EarthquakeEvent`]s collected in a [`FeedSnapshot`].

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::QuakelensError;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata
    pub metadata: Metadata,

    /// Earthquake events
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a `FeatureCollection`.
    pub fn validate(&self) -> Result<(), QuakelensError> {
        if self.type_ != "FeatureCollection" {
            return Err(QuakelensError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    /// When this feed was generated (ms since epoch)
    pub generated: i64,

    /// Human-readable title
    #[serde(default)]
    pub title: Option<String>,

    /// Number of events in response
    #[serde(default)]
    pub count: Option<usize>,
}

/// A single earthquake event as published on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Unique event ID
    pub id: String,

    /// Geographic location, occasionally missing
    #[serde(default)]
    pub geometry: Option<Geometry>,

    /// Event properties
    pub properties: Properties,
}

/// Point geometry: `[longitude, latitude, depth_km]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Vec<Option<f64>>,
}

/// The subset of USGS event properties the dashboard consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    pub mag: Option<f64>,

    #[serde(rename = "magType", default)]
    pub mag_type: Option<String>,

    #[serde(default)]
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Event type (earthquake, quarry blast, ...)
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    #[serde(default)]
    pub alert: Option<AlertLevel>,

    /// Tsunami flag: 0 or 1
    #[serde(default)]
    pub tsunami: i32,
}

/// PAGER alert level attached to significant events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
    /// Any level this build does not know about
    #[serde(other)]
    Unknown,
}

impl AlertLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Unknown => "unknown",
        }
    }
}

/// Event location. Depth is in kilometers, positive down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
    pub depth_km: f64,
}

impl Coordinates {
    /// Both angles are finite and inside the world bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// One seismic event. Immutable once built from a feed response.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeEvent {
    pub id: String,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
    pub place: Option<String>,
    pub title: Option<String>,
    /// Origin time (ms since epoch, UTC)
    pub occurred_at: i64,
    pub detail_url: Option<String>,
    pub alert: Option<AlertLevel>,
    pub tsunami: bool,
    pub event_type: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl EarthquakeEvent {
    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.occurred_at).single()
    }

    #[must_use]
    pub fn place(&self) -> &str {
        self.place.as_deref().unwrap_or("Unknown location")
    }

    /// Title as published, or one assembled from magnitude and place.
    #[must_use]
    pub fn title(&self) -> String {
        match (&self.title, self.magnitude) {
            (Some(title), _) => title.clone(),
            (None, Some(mag)) => format!("M {mag:.1} - {}", self.place()),
            (None, None) => self.place().to_string(),
        }
    }

    /// Coordinates, but only when they can be placed on the map.
    #[must_use]
    pub fn valid_coordinates(&self) -> Option<Coordinates> {
        self.coordinates.filter(Coordinates::is_valid)
    }
}

impl From<Feature> for EarthquakeEvent {
    fn from(f: Feature) -> Self {
        let coordinates = f.geometry.and_then(|g| match g.coordinates.as_slice() {
            [Some(longitude), Some(latitude), rest @ ..] => Some(Coordinates {
                longitude: *longitude,
                latitude: *latitude,
                depth_km: rest.first().copied().flatten().unwrap_or(0.0),
            }),
            _ => None,
        });

        Self {
            id: f.id,
            magnitude: f.properties.mag,
            magnitude_type: f.properties.mag_type,
            place: f.properties.place,
            title: f.properties.title,
            occurred_at: f.properties.time,
            detail_url: f.properties.url,
            alert: f.properties.alert,
            tsunami: f.properties.tsunami != 0,
            event_type: f.properties.event_type,
            coordinates,
        }
    }
}

/// One immutable fetched feed response.
///
/// Replaced wholesale on every refetch, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// When the feed was generated (ms since epoch)
    pub generated_at: i64,
    pub title: Option<String>,
    pub events: Vec<Arc<EarthquakeEvent>>,
}

impl FeedSnapshot {
    /// Parse a raw feed body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid GeoJSON feature collection.
    pub fn from_json(body: &str) -> Result<Self, QuakelensError> {
        let collection: FeatureCollection = serde_json::from_str(body)?;
        Self::try_from(collection)
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Arc<EarthquakeEvent>> {
        self.events.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl TryFrom<FeatureCollection> for FeedSnapshot {
    type Error = QuakelensError;

    fn try_from(collection: FeatureCollection) -> Result<Self, Self::Error> {
        collection.validate()?;

        if let Some(count) = collection.metadata.count {
            if count != collection.features.len() {
                tracing::debug!(
                    "feed metadata reports {} events, body carries {}",
                    count,
                    collection.features.len()
                );
            }
        }

        Ok(Self {
            generated_at: collection.metadata.generated,
            title: collection.metadata.title,
            events: collection
                .features
                .into_iter()
                .map(|f| Arc::new(EarthquakeEvent::from(f)))
                .collect(),
        })
    }
}

/// Normalized event shape for JSON/NDJSON output and the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: String,
    pub time: String,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
    pub depth_km: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: String,
    pub title: String,
    pub alert: Option<AlertLevel>,
    pub tsunami: bool,
    pub url: Option<String>,
}

impl From<&EarthquakeEvent> for OutputEvent {
    fn from(e: &EarthquakeEvent) -> Self {
        Self {
            id: e.id.clone(),
            time: e
                .time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".into()),
            magnitude: e.magnitude,
            magnitude_type: e.magnitude_type.clone(),
            depth_km: e.coordinates.map(|c| c.depth_km),
            latitude: e.coordinates.map(|c| c.latitude),
            longitude: e.coordinates.map(|c| c.longitude),
            place: e.place().to_string(),
            title: e.title(),
            alert: e.alert,
            tsunami: e.tsunami,
            url: e.detail_url.clone(),
        }
    }
}
