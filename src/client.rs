//! USGS earthquake feed client.
//!
//! Provides async HTTP access to the GeoJSON summary feeds.
//! Uses reqwest with rustls for TLS.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::QuakelensError;
use crate::models::FeedSnapshot;

/// Default request timeout in seconds.
///
/// Bounds how long the dashboard can sit in the loading state.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakelens/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Minimum-magnitude tier of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTier {
    All,
    Mag1,
    Mag25,
    Mag45,
    Significant,
}

/// Rolling time window of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedWindow {
    Hour,
    Day,
    Week,
    Month,
}

/// A USGS summary feed, e.g. `all_day` or `2.5_week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedType {
    pub tier: FeedTier,
    pub window: FeedWindow,
}

impl FeedType {
    /// The rolling 24 hour feed of every event.
    pub const ALL_DAY: Self = Self {
        tier: FeedTier::All,
        window: FeedWindow::Day,
    };

    /// URL of this feed below `base_url`.
    #[must_use]
    pub fn url(self, base_url: &str) -> String {
        format!("{base_url}/earthquakes/feed/v1.0/summary/{self}.geojson")
    }
}

impl Default for FeedType {
    fn default() -> Self {
        Self::ALL_DAY
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tier = match self.tier {
            FeedTier::All => "all",
            FeedTier::Mag1 => "1.0",
            FeedTier::Mag25 => "2.5",
            FeedTier::Mag45 => "4.5",
            FeedTier::Significant => "significant",
        };
        let window = match self.window {
            FeedWindow::Hour => "hour",
            FeedWindow::Day => "day",
            FeedWindow::Week => "week",
            FeedWindow::Month => "month",
        };
        write!(f, "{tier}_{window}")
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (tier, window) = lower
            .rsplit_once('_')
            .ok_or_else(|| format!("unknown feed type: {s}"))?;

        let tier = match tier {
            "all" => FeedTier::All,
            "1.0" => FeedTier::Mag1,
            "2.5" => FeedTier::Mag25,
            "4.5" => FeedTier::Mag45,
            "significant" => FeedTier::Significant,
            _ => return Err(format!("unknown feed type: {s}")),
        };
        let window = match window {
            "hour" => FeedWindow::Hour,
            "day" => FeedWindow::Day,
            "week" => FeedWindow::Week,
            "month" => FeedWindow::Month,
            _ => return Err(format!("unknown feed type: {s}")),
        };

        Ok(Self { tier, window })
    }
}

/// Anything that can produce a fresh feed snapshot.
///
/// The feed store is generic over this so it can run without network access.
pub trait FeedSource: Send + Sync + 'static {
    /// Fetch and parse one complete snapshot.
    fn fetch_snapshot(&self) -> impl Future<Output = Result<FeedSnapshot, QuakelensError>> + Send;
}

/// Client for the USGS summary feed.
#[derive(Debug, Clone)]
pub struct UsgsClient {
    client: Client,
    url: String,
}

impl UsgsClient {
    /// Create a client for one of the USGS summary feeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(feed_type: FeedType) -> Result<Self, QuakelensError> {
        Self::with_url(feed_type.url(USGS_BASE_URL))
    }

    /// Create a client for an explicit feed URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_url(url: impl Into<String>) -> Result<Self, QuakelensError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body cannot be parsed.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_feed(&self) -> Result<FeedSnapshot, QuakelensError> {
        debug!("fetching feed");

        let response = self.client.get(&self.url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            return Err(QuakelensError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let snapshot = FeedSnapshot::from_json(&body)?;

        debug!("fetched {} events", snapshot.len());
        Ok(snapshot)
    }
}

impl FeedSource for UsgsClient {
    async fn fetch_snapshot(&self) -> Result<FeedSnapshot, QuakelensError> {
        self.fetch_feed().await
    }
}
