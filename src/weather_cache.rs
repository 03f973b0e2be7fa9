//! Read-through weather cache with stale fallback
//!
//! Wraps the OpenWeather fetchers with the durable [`CacheManager`]. A fresh
//! entry (younger than the TTL) is returned without touching the network.
//! Otherwise a live fetch is attempted; success overwrites the entry, failure
//! falls back to whatever was stored before, however old. Only a key that has
//! never been fetched successfully can surface a fetch error.
//!
//! Concurrent refreshes of the same key are not coalesced: both fetch, and
//! whichever write lands last is what the next read sees.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::data::{AirQualitySnapshot, FetchError, ForecastBundle, OpenWeatherClient, WeatherSnapshot};

/// Default freshness window for persisted weather data
pub const PERSISTENT_TTL_MINUTES: i64 = 30;

/// Returns the cached value for `key` if fresh, otherwise refreshes it via `fetch`
///
/// Storage problems never surface: an unreadable entry counts as a miss and a
/// failed write is logged while the fresh data is still returned.
pub async fn get_or_refresh<T, E, F, Fut>(
    store: &CacheManager,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let previous = match store.read::<T>(key, ttl).await {
        Some(entry) if !entry.is_expired => {
            debug!(key, "returning cached data");
            return Ok(entry.data);
        }
        other => other,
    };

    info!(key, stale = previous.is_some(), "fetching fresh data");
    match fetch().await {
        Ok(data) => {
            if let Err(e) = store.write(key, &data).await {
                warn!(key, error = %e, "failed to persist fresh data");
            }
            Ok(data)
        }
        Err(e) => match previous {
            Some(stale) => {
                warn!(key, error = %e, cached_at = %stale.cached_at, "returning cached data due to error");
                Ok(stale.data)
            }
            None => Err(e),
        },
    }
}

/// Persistent, stale-tolerant front for the weather fetchers
#[derive(Debug, Clone)]
pub struct WeatherCache {
    store: CacheManager,
    client: OpenWeatherClient,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(store: CacheManager, client: OpenWeatherClient) -> Self {
        Self {
            store,
            client,
            ttl: Duration::minutes(PERSISTENT_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn client(&self) -> &OpenWeatherClient {
        &self.client
    }

    /// Current conditions, persisted under `currentWeather_<location>`
    pub async fn current_weather(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        let key = format!("currentWeather_{}", location);
        get_or_refresh(&self.store, &key, self.ttl, || self.client.current_weather(location)).await
    }

    /// Forecast, persisted under `forecast_<location>`
    pub async fn forecast(&self, location: &str) -> Result<ForecastBundle, FetchError> {
        let key = format!("forecast_{}", location);
        get_or_refresh(&self.store, &key, self.ttl, || self.client.forecast(location)).await
    }

    /// Air quality, persisted under `airQuality_<location>`
    pub async fn air_quality(&self, location: &str) -> Result<AirQualitySnapshot, FetchError> {
        let key = format!("airQuality_{}", location);
        get_or_refresh(&self.store, &key, self.ttl, || self.client.air_quality(location)).await
    }
}
