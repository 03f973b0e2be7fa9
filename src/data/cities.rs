//! Major world cities and their local clocks

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{OpenWeatherClient, UnsplashClient, WeatherSnapshot};

/// A city shown in the world snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct City {
    pub name: &'static str,
    /// IANA timezone name
    pub timezone: &'static str,
}

/// Cities shown in the world snapshot, in display order
pub const MAJOR_CITIES: [City; 20] = [
    City { name: "New York", timezone: "America/New_York" },
    City { name: "Tokyo", timezone: "Asia/Tokyo" },
    City { name: "London", timezone: "Europe/London" },
    City { name: "Paris", timezone: "Europe/Paris" },
    City { name: "Sydney", timezone: "Australia/Sydney" },
    City { name: "Dubai", timezone: "Asia/Dubai" },
    City { name: "Rio de Janeiro", timezone: "America/Sao_Paulo" },
    City { name: "Moscow", timezone: "Europe/Moscow" },
    City { name: "Singapore", timezone: "Asia/Singapore" },
    City { name: "Hong Kong", timezone: "Asia/Hong_Kong" },
    City { name: "Mumbai", timezone: "Asia/Kolkata" },
    City { name: "Toronto", timezone: "America/Toronto" },
    City { name: "Berlin", timezone: "Europe/Berlin" },
    City { name: "Madrid", timezone: "Europe/Madrid" },
    City { name: "Seoul", timezone: "Asia/Seoul" },
    City { name: "Mexico City", timezone: "America/Mexico_City" },
    City { name: "Cape Town", timezone: "Africa/Johannesburg" },
    City { name: "Istanbul", timezone: "Europe/Istanbul" },
    City { name: "Bangkok", timezone: "Asia/Bangkok" },
    City { name: "Amsterdam", timezone: "Europe/Amsterdam" },
];

/// Current weather for a city plus its photo and wall-clock time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityForecast {
    #[serde(flatten)]
    pub weather: WeatherSnapshot,
    pub image_url: String,
    /// Local time as "HH:MM"
    pub local_time: String,
    pub timezone: String,
}

/// Formats `now` as "HH:MM" in the given IANA timezone
///
/// Returns `None` for an unknown timezone name.
pub fn local_time(timezone: &str, now: DateTime<Utc>) -> Option<String> {
    let tz: Tz = timezone.parse().ok()?;
    Some(now.with_timezone(&tz).format("%H:%M").to_string())
}

impl CityForecast {
    /// Recomputes `local_time` for the minute-by-minute clock tick
    pub fn refresh_local_time(&mut self, now: DateTime<Utc>) {
        if let Some(time) = local_time(&self.timezone, now) {
            self.local_time = time;
        }
    }
}

/// Fetches weather and a photo for every city concurrently
///
/// Cities whose weather cannot be fetched are left out; a missing photo falls
/// back to the placeholder.
pub async fn world_snapshot(
    weather: &OpenWeatherClient,
    images: &UnsplashClient,
    cities: &[City],
) -> Vec<CityForecast> {
    let now = Utc::now();
    let fetches = cities.iter().map(|city| async move {
        let (snapshot, image_url) =
            futures::join!(weather.current_weather(city.name), images.city_image(city.name));
        match snapshot {
            Ok(snapshot) => Some(CityForecast {
                weather: snapshot,
                image_url,
                local_time: local_time(city.timezone, now).unwrap_or_default(),
                timezone: city.timezone.to_string(),
            }),
            Err(e) => {
                warn!(city = city.name, error = %e, "skipping city");
                None
            }
        }
    });

    join_all(fetches).await.into_iter().flatten().collect()
}
