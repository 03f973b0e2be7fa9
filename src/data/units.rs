//! Measurement units and conversions

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const METERS_PER_MILE: f64 = 1609.34;
const MM_PER_INCH: f64 = 25.4;

/// Unit system requested from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Fahrenheit, miles per hour, inches
    #[default]
    Imperial,
    /// Celsius, metres per second, millimetres
    Metric,
}

impl Units {
    /// Value passed as the provider's `units` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    pub fn temperature_label(self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
        }
    }

    pub fn wind_speed_label(self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric => "m/s",
        }
    }

    pub fn precipitation_label(self) -> &'static str {
        match self {
            Units::Imperial => "in",
            Units::Metric => "mm",
        }
    }

    /// Converts a visibility in metres to whole miles or kilometres
    pub fn visibility(self, meters: f64) -> i32 {
        match self {
            Units::Imperial => (meters / METERS_PER_MILE).round() as i32,
            Units::Metric => (meters / 1000.0).round() as i32,
        }
    }

    /// Converts a rain amount reported in millimetres, rounded to hundredths
    pub fn precipitation(self, mm: f64) -> f64 {
        let value = match self {
            Units::Imperial => mm / MM_PER_INCH,
            Units::Metric => mm,
        };
        (value * 100.0).round() / 100.0
    }
}

/// Converts a Celsius reading for display
///
/// Returns the value unchanged when `is_celsius` is set, otherwise Fahrenheit.
pub fn convert_temperature(celsius: f64, is_celsius: bool) -> f64 {
    if is_celsius {
        celsius
    } else {
        celsius * 9.0 / 5.0 + 32.0
    }
}

/// Approximate dew point from temperature and relative humidity
pub fn dew_point(temperature: f64, humidity: f64) -> i32 {
    (temperature - (100.0 - humidity) / 5.0).round() as i32
}
