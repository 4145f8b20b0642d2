//! Error types for quakelens.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in quakelens operations.
#[derive(Error, Debug)]
pub enum QuakelensError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Feed endpoint returned a non-success status
    #[error("USGS feed error (HTTP {status})")]
    Api { status: u16 },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Input validation failed
    #[error("Invalid value: {0}")]
    Validation(String),

    /// The map view could not be set up or was used after disposal
    #[error("Map view error: {0}")]
    MapView(String),
}
