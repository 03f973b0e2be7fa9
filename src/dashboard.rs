//! Application side of the dashboard
//!
//! Loads everything shown for one location through the persistent cache and
//! reloads when the offline worker signals that new weather data is due.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::{AirQualitySnapshot, FetchError, ForecastBundle, WeatherSnapshot};
use crate::weather_cache::WeatherCache;
use crate::worker::{ClientChannel, WorkerMessage};

/// Everything displayed for the selected location
///
/// A section that failed to load (and had nothing cached) is `None` and its
/// error message is kept in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub location: String,
    pub current: Option<WeatherSnapshot>,
    pub forecast: Option<ForecastBundle>,
    pub air_quality: Option<AirQualitySnapshot>,
    pub errors: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

impl DashboardView {
    /// Current conditions and forecast both loaded
    ///
    /// Air quality is optional for a usable view.
    pub fn has_weather(&self) -> bool {
        self.current.is_some() && self.forecast.is_some()
    }
}

/// Dashboard bound to one location at a time
#[derive(Debug, Clone)]
pub struct Dashboard {
    cache: WeatherCache,
    location: String,
}

impl Dashboard {
    pub fn new(cache: WeatherCache, location: impl Into<String>) -> Self {
        Self {
            cache,
            location: location.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Switches to another location; the next load uses it
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    /// Loads current conditions, forecast and air quality concurrently
    pub async fn load(&self) -> DashboardView {
        let location = self.location.as_str();
        let (current, forecast, air_quality) = tokio::join!(
            self.cache.current_weather(location),
            self.cache.forecast(location),
            self.cache.air_quality(location),
        );

        let mut errors = Vec::new();
        let current = section("current weather", current, &mut errors);
        let forecast = section("forecast", forecast, &mut errors);
        let air_quality = section("air quality", air_quality, &mut errors);

        DashboardView {
            location: self.location.clone(),
            current,
            forecast,
            air_quality,
            errors,
            loaded_at: Utc::now(),
        }
    }

    /// Reloads the view every time the worker broadcasts a weather update
    ///
    /// Runs until the worker side of `channel` goes away and returns the number
    /// of reloads performed.
    pub async fn follow_updates<F>(&self, channel: &mut ClientChannel, mut on_view: F) -> usize
    where
        F: FnMut(DashboardView),
    {
        let mut reloads = 0;
        while let Some(message) = channel.recv().await {
            match message {
                WorkerMessage::WeatherUpdate => {
                    info!(location = %self.location, "weather update requested by worker");
                    on_view(self.load().await);
                    reloads += 1;
                }
            }
        }
        debug!(client = channel.id(), "worker channel closed");
        reloads
    }
}

fn section<T>(name: &str, result: Result<T, FetchError>, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section = name, error = %e, "failed to load");
            errors.push(format!("Failed to load {}: {}", name, e));
            None
        }
    }
}
