//! OpenCage forward geocoding
//!
//! Resolves a place name to coordinates and an IANA timezone. Lookups are
//! best-effort: any failure is logged and reported as "no result".

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Base URL for the OpenCage geocoding API
pub const OPENCAGE_BASE_URL: &str = "https://api.opencagedata.com";

/// Coordinates and timezone of a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub lat: f64,
    pub lng: f64,
    /// IANA timezone name, e.g. "Europe/London"
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    geometry: Geometry,
    annotations: Annotations,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Annotations {
    timezone: TimezoneAnnotation,
}

#[derive(Debug, Deserialize)]
struct TimezoneAnnotation {
    name: String,
}

/// Client for the OpenCage geocoding API
#[derive(Debug, Clone)]
pub struct OpenCageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenCageClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENCAGE_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Looks up the first match for `location`
    ///
    /// Returns `None` when nothing matches or the lookup fails.
    pub async fn location_data(&self, location: &str) -> Option<LocationData> {
        match self.lookup(location).await {
            Ok(found) => found,
            Err(e) => {
                warn!(location, error = %e, "error fetching location data");
                None
            }
        }
    }

    async fn lookup(&self, location: &str) -> Result<Option<LocationData>, reqwest::Error> {
        debug!(location, "geocoding with OpenCage");
        let url = format!("{}/geocode/v1/json", self.base_url);
        let response: OpenCageResponse = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("key", self.api_key.as_str()),
                ("language", "en"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.into_iter().next().map(|r| LocationData {
            lat: r.geometry.lat,
            lng: r.geometry.lng,
            timezone: r.annotations.timezone.name,
        }))
    }
}
