//! Minimum-magnitude filtering.
//!
//! The dashboard has exactly one filter: a magnitude threshold slider.

use std::fmt;
use std::sync::Arc;

use crate::errors::QuakelensError;
use crate::models::EarthquakeEvent;

/// Minimum-magnitude threshold, in [0, 8] on a 0.5 grid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MagnitudeThreshold(f64);

impl MagnitudeThreshold {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 8.0;
    pub const STEP: f64 = 0.5;
    pub const DEFAULT: f64 = 2.5;

    /// Build a threshold, snapping to the nearest slider step.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not finite or outside [0, 8].
    pub fn new(value: f64) -> Result<Self, QuakelensError> {
        if !value.is_finite() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(QuakelensError::Validation(format!(
                "minimum magnitude {value} out of range [{}, {}]",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self((value / Self::STEP).round() * Self::STEP))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Check if an event passes the threshold. Events without a magnitude never do.
    #[must_use]
    pub fn matches(self, event: &EarthquakeEvent) -> bool {
        event.magnitude.is_some_and(|m| m >= self.0)
    }

    /// The events passing the threshold, in feed order.
    #[must_use]
    pub fn filter_events(self, events: &[Arc<EarthquakeEvent>]) -> Vec<Arc<EarthquakeEvent>> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

impl Default for MagnitudeThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for MagnitudeThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl std::str::FromStr for MagnitudeThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid magnitude '{s}': {e}"))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}
