//! Core data models for the weather dashboard
//!
//! This module contains the normalized records produced by the provider
//! clients. They are plain values: a fresh fetch builds a new instance that
//! replaces the old one, nothing is mutated in place.

pub mod cities;
pub mod geocoding;
pub mod images;
pub mod news;
pub mod units;
pub mod weather;

pub use cities::{CityForecast, MAJOR_CITIES};
pub use geocoding::{LocationData, OpenCageClient};
pub use images::{UnsplashClient, PLACEHOLDER_IMAGE};
pub use news::{NewsArticle, NewsClient};
pub use units::Units;
pub use weather::{FetchError, OpenWeatherClient};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current conditions for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Place name as resolved by the provider
    pub location: String,
    /// ISO country code
    pub country: String,
    pub temperature: i32,
    pub feels_like: i32,
    /// Human-readable condition, e.g. "light rain"
    pub description: String,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    pub wind_speed: i32,
    /// Provider icon code, e.g. "10d"
    pub icon: String,
    /// Temperature unit label
    pub unit: String,
    pub wind_speed_unit: String,
    /// Rain over the last hour
    pub precipitation: f64,
    /// Sea-level pressure in hPa
    pub pressure: u32,
    pub dew_point: i32,
    /// Visibility in miles (imperial) or kilometres (metric)
    pub visibility: i32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// When this snapshot was fetched
    pub last_updated: DateTime<Utc>,
}

/// One day of the forecast, sampled at local noon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    /// Short weekday label, e.g. "Mon"
    pub date: String,
    pub temperature: i32,
    pub description: String,
    pub icon: String,
    pub precipitation: f64,
    pub wind_speed: i32,
}

/// One three-hour slot of the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    /// 12-hour clock label, e.g. "3 PM"
    pub time: String,
    pub temperature: i32,
    pub description: String,
    pub icon: String,
    pub precipitation: f64,
}

/// Daily and hourly forecasts in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastBundle {
    pub daily: Vec<DailyForecast>,
    pub hourly: Vec<HourlyForecast>,
    pub unit: String,
    pub precipitation_unit: String,
    pub wind_speed_unit: String,
}

/// Air quality index and pollutant concentrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySnapshot {
    /// AQI category, 1 (good) through 5 (very poor)
    pub aqi: u8,
    /// Pollutant name (e.g. "pm2_5") to concentration in μg/m³
    pub components: BTreeMap<String, f64>,
}

impl AirQualitySnapshot {
    /// Human-readable name of the AQI category
    pub fn label(&self) -> &'static str {
        match self.aqi {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

/// A geocoding match from the weather provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}
