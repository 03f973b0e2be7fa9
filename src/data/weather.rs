//! OpenWeather API client
//!
//! This module fetches current conditions, 5-day forecasts, air pollution and
//! direct geocoding results from OpenWeather and normalizes them into our
//! records. Every successful result is kept in the shared [`ResponseCache`] so
//! that repeated calls within its TTL do not hit the network. There is no
//! retry: each call is a single attempt.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use super::units::{dew_point, Units};
use super::{
    AirQualitySnapshot, DailyForecast, ForecastBundle, GeoLocation, HourlyForecast,
    WeatherSnapshot,
};
use crate::cache::ResponseCache;

/// Base URL for the OpenWeather API
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Number of three-hour slots in the hourly forecast (next 24 hours)
const HOURLY_SLOTS: usize = 8;

/// Marker identifying the daily sample in the three-hourly list
const DAILY_SAMPLE_TIME: &str = "12:00:00";

/// Errors that can occur when fetching from a provider
///
/// These all represent the same condition to callers ("the fetch failed");
/// the variants only shape the message.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request failed without a response (offline, DNS, timeout)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} API responded with status: {status}")]
    Status { provider: &'static str, status: u16 },

    /// Provider reported an error inside a successful response body
    #[error("{provider} API responded with code: {code}, message: {message}")]
    Provider {
        provider: &'static str,
        code: String,
        message: String,
    },

    /// Response body was empty or did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The query matched nothing
    #[error("{0}")]
    NotFound(String),
}

/// Client for the OpenWeather current, forecast, air pollution and geocoding endpoints
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    units: Units,
    cache: ResponseCache,
}

impl OpenWeatherClient {
    /// Creates a client that stores results in `cache`
    pub fn new(api_key: impl Into<String>, cache: ResponseCache) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            units: Units::default(),
            cache,
        }
    }

    /// Use a custom HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Fetch current conditions for a free-form place name
    pub async fn current_weather(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        let cache_key = format!("weather_{}_{}", location, self.units.as_str());
        if let Some(cached) = self.cache.get::<WeatherSnapshot>(&cache_key) {
            debug!(location, "current weather served from memory");
            return Ok(cached);
        }

        debug!(location, "fetching current weather");
        let body = self
            .get_json(
                "Weather",
                "/data/2.5/weather",
                &[("q", location), ("units", self.units.as_str())],
            )
            .await?;
        check_code("Weather", &body)?;
        let response: CurrentResponse = decode("Weather", body)?;
        let snapshot = self.parse_current(response, Utc::now())?;

        self.cache.insert(cache_key, snapshot.clone());
        Ok(snapshot)
    }

    /// Fetch the 5-day / 3-hour forecast for a free-form place name
    pub async fn forecast(&self, location: &str) -> Result<ForecastBundle, FetchError> {
        let cache_key = format!("forecast_{}_{}", location, self.units.as_str());
        if let Some(cached) = self.cache.get::<ForecastBundle>(&cache_key) {
            debug!(location, "forecast served from memory");
            return Ok(cached);
        }

        debug!(location, "fetching forecast");
        let body = self
            .get_json(
                "Forecast",
                "/data/2.5/forecast",
                &[("q", location), ("units", self.units.as_str())],
            )
            .await?;
        check_code("Forecast", &body)?;
        let response: ForecastResponse = decode("Forecast", body)?;
        let bundle = self.parse_forecast(response)?;

        self.cache.insert(cache_key, bundle.clone());
        Ok(bundle)
    }

    /// Fetch air pollution for a place name, resolving its coordinates first
    pub async fn air_quality(&self, location: &str) -> Result<AirQualitySnapshot, FetchError> {
        let cache_key = format!("airquality_{}", location);
        if let Some(cached) = self.cache.get::<AirQualitySnapshot>(&cache_key) {
            debug!(location, "air quality served from memory");
            return Ok(cached);
        }

        debug!(location, "fetching air quality");
        let coords = self.coordinates(location).await?.ok_or_else(|| {
            FetchError::NotFound("Could not get coordinates for the location".to_string())
        })?;

        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let body = self
            .get_json(
                "Air Quality",
                "/data/2.5/air_pollution",
                &[("lat", lat.as_str()), ("lon", lon.as_str())],
            )
            .await?;
        let response: AirPollutionResponse = decode("Air Quality", body)?;
        let first = response
            .list
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Malformed("No air quality data available".to_string()))?;

        let snapshot = AirQualitySnapshot {
            aqi: first.main.aqi,
            components: first.components,
        };
        self.cache.insert(cache_key, snapshot.clone());
        Ok(snapshot)
    }

    /// Best geocoding match for a place name, if any
    pub async fn coordinates(&self, location: &str) -> Result<Option<GeoLocation>, FetchError> {
        Ok(self.geocode(location, 1).await?.into_iter().next())
    }

    /// Up to five geocoding matches, for search-as-you-type suggestions
    pub async fn search_locations(&self, query: &str) -> Result<Vec<GeoLocation>, FetchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.geocode(query, 5).await
    }

    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<GeoLocation>, FetchError> {
        let limit = limit.to_string();
        let body = self
            .get_json(
                "Geocoding",
                "/geo/1.0/direct",
                &[("q", query), ("limit", limit.as_str())],
            )
            .await?;
        decode("Geocoding", body)
    }

    /// Issue a GET and parse the body as JSON, mapping failures to `FetchError`
    async fn get_json(
        &self,
        provider: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                provider,
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Err(FetchError::Malformed(format!("{} API returned an empty body", provider)));
        }
        serde_json::from_str(&text)
            .map_err(|e| FetchError::Malformed(format!("{} API returned invalid JSON: {}", provider, e)))
    }

    fn parse_current(
        &self,
        response: CurrentResponse,
        fetched_at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, FetchError> {
        let condition = response
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Malformed("missing weather conditions".to_string()))?;
        let main = response.main;

        Ok(WeatherSnapshot {
            location: response.name,
            country: response.sys.country.unwrap_or_default(),
            temperature: main.temp.round() as i32,
            feels_like: main.feels_like.round() as i32,
            description: condition.description,
            humidity: main.humidity.round().clamp(0.0, 100.0) as u8,
            wind_speed: response.wind.speed.round() as i32,
            icon: condition.icon,
            unit: self.units.temperature_label().to_string(),
            wind_speed_unit: self.units.wind_speed_label().to_string(),
            precipitation: self
                .units
                .precipitation(response.rain.and_then(|r| r.one_hour).unwrap_or(0.0)),
            pressure: main.pressure.round() as u32,
            dew_point: dew_point(main.temp, main.humidity),
            visibility: self.units.visibility(response.visibility.unwrap_or(0.0)),
            sunrise: unix_time(response.sys.sunrise)?,
            sunset: unix_time(response.sys.sunset)?,
            last_updated: fetched_at,
        })
    }

    fn parse_forecast(&self, response: ForecastResponse) -> Result<ForecastBundle, FetchError> {
        let offset = FixedOffset::east_opt(response.city.timezone).unwrap_or(Utc.fix());

        let mut daily = Vec::new();
        for item in response.list.iter().filter(|i| i.dt_txt.contains(DAILY_SAMPLE_TIME)) {
            let (description, icon) = item.condition()?;
            daily.push(DailyForecast {
                date: unix_time(item.dt)?.with_timezone(&offset).format("%a").to_string(),
                temperature: item.main.temp.round() as i32,
                description,
                icon,
                precipitation: self.units.precipitation(item.rain_3h()),
                wind_speed: item.wind.speed.round() as i32,
            });
        }

        let mut hourly = Vec::with_capacity(HOURLY_SLOTS);
        for item in response.list.iter().take(HOURLY_SLOTS) {
            let (description, icon) = item.condition()?;
            hourly.push(HourlyForecast {
                time: unix_time(item.dt)?.with_timezone(&offset).format("%-I %p").to_string(),
                temperature: item.main.temp.round() as i32,
                description,
                icon,
                precipitation: self.units.precipitation(item.rain_3h()),
            });
        }

        Ok(ForecastBundle {
            daily,
            hourly,
            unit: self.units.temperature_label().to_string(),
            precipitation_unit: self.units.precipitation_label().to_string(),
            wind_speed_unit: self.units.wind_speed_label().to_string(),
        })
    }
}

/// Rejects bodies whose embedded `cod` is not 200 (as number or string)
fn check_code(provider: &'static str, body: &Value) -> Result<(), FetchError> {
    let cod = &body["cod"];
    if cod.as_i64() == Some(200) || cod.as_str() == Some("200") {
        return Ok(());
    }
    let code = match cod {
        Value::String(s) => s.clone(),
        Value::Null => "missing".to_string(),
        other => other.to_string(),
    };
    Err(FetchError::Provider {
        provider,
        code,
        message: body["message"].as_str().unwrap_or_default().to_string(),
    })
}

fn decode<T: DeserializeOwned>(provider: &'static str, body: Value) -> Result<T, FetchError> {
    serde_json::from_value(body)
        .map_err(|e| FetchError::Malformed(format!("unexpected {} response: {}", provider, e)))
}

fn unix_time(secs: i64) -> Result<DateTime<Utc>, FetchError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| FetchError::Malformed(format!("invalid timestamp: {}", secs)))
}

/// Current weather response from OpenWeather
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    sys: CurrentSys,
    main: MainReadings,
    weather: Vec<Condition>,
    wind: Wind,
    visibility: Option<f64>,
    rain: Option<Rain>,
}

#[derive(Debug, Deserialize)]
struct CurrentSys {
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Rain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

/// Forecast response from OpenWeather
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
    #[serde(default)]
    city: ForecastCity,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastCity {
    /// Offset from UTC in seconds
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    dt_txt: String,
    main: MainReadings,
    weather: Vec<Condition>,
    wind: Wind,
    rain: Option<Rain>,
}

impl ForecastItem {
    fn condition(&self) -> Result<(String, String), FetchError> {
        self.weather
            .first()
            .map(|c| (c.description.clone(), c.icon.clone()))
            .ok_or_else(|| FetchError::Malformed(format!("no conditions for {}", self.dt_txt)))
    }

    fn rain_3h(&self) -> f64 {
        self.rain.as_ref().and_then(|r| r.three_hours).unwrap_or(0.0)
    }
}

/// Air pollution response from OpenWeather
#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionItem>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionItem {
    main: AirIndex,
    #[serde(default)]
    components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct AirIndex {
    aqi: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_body() -> Value {
        json!({
            "coord": {"lon": -0.1257, "lat": 51.5085},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {
                "temp": 59.4,
                "feels_like": 58.6,
                "temp_min": 57.0,
                "temp_max": 61.0,
                "pressure": 1012,
                "humidity": 80
            },
            "visibility": 10000,
            "wind": {"speed": 9.22, "deg": 240},
            "rain": {"1h": 3.0},
            "dt": 1721040000,
            "sys": {"country": "GB", "sunrise": 1721016000, "sunset": 1721073600},
            "timezone": 3600,
            "name": "London",
            "cod": 200
        })
    }

    fn forecast_item(dt: i64, dt_txt: &str, temp: f64) -> Value {
        json!({
            "dt": dt,
            "main": {"temp": temp, "feels_like": temp, "pressure": 1010, "humidity": 70},
            "weather": [{"description": "clear sky", "icon": "01d"}],
            "wind": {"speed": 4.6},
            "rain": {"3h": 2.54},
            "dt_txt": dt_txt
        })
    }

    /// Three days of three-hourly slots starting 2024-07-15 00:00 UTC
    fn forecast_body() -> Value {
        let start = 1_721_001_600_i64;
        let list: Vec<Value> = (0..24)
            .map(|i| {
                let dt = start + i * 3 * 3600;
                let when = Utc.timestamp_opt(dt, 0).unwrap();
                forecast_item(dt, &when.format("%Y-%m-%d %H:%M:%S").to_string(), 60.0 + i as f64)
            })
            .collect();
        json!({"cod": "200", "message": 0, "cnt": 24, "list": list, "city": {"name": "London", "timezone": 0}})
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new("test-key", ResponseCache::default()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_current_weather_normalizes_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("units", "imperial"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let weather = client_for(&server).current_weather("London").await.unwrap();

        assert_eq!(weather.location, "London");
        assert_eq!(weather.country, "GB");
        assert_eq!(weather.temperature, 59);
        assert_eq!(weather.feels_like, 59);
        assert_eq!(weather.description, "light rain");
        assert_eq!(weather.humidity, 80);
        assert_eq!(weather.wind_speed, 9);
        assert_eq!(weather.icon, "10d");
        assert_eq!(weather.unit, "°F");
        assert_eq!(weather.wind_speed_unit, "mph");
        assert_eq!(weather.precipitation, 0.12);
        assert_eq!(weather.pressure, 1012);
        assert_eq!(weather.dew_point, 55);
        assert_eq!(weather.visibility, 6);
        assert_eq!(weather.sunrise.timestamp(), 1_721_016_000);
        assert_eq!(weather.sunset.timestamp(), 1_721_073_600);
    }

    #[tokio::test]
    async fn test_current_weather_uses_metric_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let weather = client_for(&server)
            .with_units(Units::Metric)
            .current_weather("London")
            .await
            .unwrap();

        assert_eq!(weather.unit, "°C");
        assert_eq!(weather.wind_speed_unit, "m/s");
        assert_eq!(weather.visibility, 10);
        assert_eq!(weather.precipitation, 3.0);
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_memory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.current_weather("London").await.unwrap();
        let second = client.current_weather("London").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_memory_cache_key_includes_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .expect(2)
            .mount(&server)
            .await;

        let cache = ResponseCache::default();
        let imperial = OpenWeatherClient::new("k", cache.clone()).with_base_url(server.uri());
        let metric = imperial.clone().with_units(Units::Metric);

        imperial.current_weather("London").await.unwrap();
        metric.current_weather("London").await.unwrap();

        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"cod": 401, "message": "Invalid API key"})))
            .mount(&server)
            .await;

        let err = client_for(&server).current_weather("London").await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 401, .. }));
        assert_eq!(err.to_string(), "Weather API responded with status: 401");
    }

    #[tokio::test]
    async fn test_embedded_error_code_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).current_weather("Atlantis").await.unwrap_err();

        assert!(err.to_string().contains("code: 404"));
        assert!(err.to_string().contains("city not found"));
    }

    #[tokio::test]
    async fn test_empty_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server).current_weather("London").await.unwrap_err();

        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.current_weather("London").await.is_err());
        assert!(client.current_weather("London").await.is_err());
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let client = OpenWeatherClient::new("k", ResponseCache::default())
            .with_base_url("http://127.0.0.1:9");

        let err = client.current_weather("London").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_forecast_picks_noon_samples_and_next_eight_slots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;

        let forecast = client_for(&server).forecast("London").await.unwrap();

        // 2024-07-15 is a Monday
        let days: Vec<_> = forecast.daily.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(days, ["Mon", "Tue", "Wed"]);
        assert_eq!(forecast.daily[0].temperature, 64);
        assert_eq!(forecast.daily[0].precipitation, 0.1);
        assert_eq!(forecast.daily[0].wind_speed, 5);

        let hours: Vec<_> = forecast.hourly.iter().map(|h| h.time.as_str()).collect();
        assert_eq!(
            hours,
            ["12 AM", "3 AM", "6 AM", "9 AM", "12 PM", "3 PM", "6 PM", "9 PM"]
        );
        assert_eq!(forecast.unit, "°F");
        assert_eq!(forecast.precipitation_unit, "in");
        assert_eq!(forecast.wind_speed_unit, "mph");
    }

    #[tokio::test]
    async fn test_forecast_labels_follow_city_offset() {
        let server = MockServer::start().await;
        let mut body = forecast_body();
        body["city"]["timezone"] = json!(-7 * 3600);
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let forecast = client_for(&server).forecast("Vancouver").await.unwrap();

        assert_eq!(forecast.hourly[0].time, "5 PM");
        assert_eq!(forecast.daily[0].date, "Mon");
    }

    #[tokio::test]
    async fn test_forecast_rejects_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cod": "401", "message": "bad key"})))
            .mount(&server)
            .await;

        let err = client_for(&server).forecast("London").await.unwrap_err();

        assert!(matches!(err, FetchError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_air_quality_geocodes_then_fetches_pollution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "London"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "London", "country": "GB", "state": "England", "lat": 51.5073, "lon": -0.1276}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .and(query_param("lat", "51.5073"))
            .and(query_param("lon", "-0.1276"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": {"lon": -0.1276, "lat": 51.5073},
                "list": [{
                    "main": {"aqi": 2},
                    "components": {"co": 201.94, "no2": 0.77, "o3": 68.66, "pm2_5": 0.5},
                    "dt": 1721040000
                }]
            })))
            .mount(&server)
            .await;

        let air = client_for(&server).air_quality("London").await.unwrap();

        assert_eq!(air.aqi, 2);
        assert_eq!(air.label(), "Fair");
        assert_eq!(air.components.get("pm2_5"), Some(&0.5));
        assert_eq!(air.components.len(), 4);
    }

    #[tokio::test]
    async fn test_air_quality_without_coordinates_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = client_for(&server).air_quality("Nowhere").await.unwrap_err();

        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_air_quality_with_empty_list_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "London", "country": "GB", "lat": 51.5, "lon": -0.12}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).air_quality("London").await.unwrap_err();

        assert!(err.to_string().contains("No air quality data available"));
    }

    #[tokio::test]
    async fn test_search_locations_requests_five_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Spring"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Springfield", "country": "US", "state": "Illinois", "lat": 39.8, "lon": -89.6},
                {"name": "Springfield", "country": "US", "state": "Missouri", "lat": 37.2, "lon": -93.3}
            ])))
            .mount(&server)
            .await;

        let matches = client_for(&server).search_locations("Spring").await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].state.as_deref(), Some("Missouri"));
    }

    #[tokio::test]
    async fn test_search_locations_skips_blank_query() {
        let client = OpenWeatherClient::new("k", ResponseCache::default())
            .with_base_url("http://127.0.0.1:9");

        assert!(client.search_locations("  ").await.unwrap().is_empty());
    }

    #[test]
    fn test_check_code_accepts_number_and_string() {
        assert!(check_code("Weather", &json!({"cod": 200})).is_ok());
        assert!(check_code("Forecast", &json!({"cod": "200"})).is_ok());
        assert!(check_code("Weather", &json!({})).is_err());
    }
}
