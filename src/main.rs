//! weatherdash - weather dashboard with offline caching
//!
//! Command-line front end: one-shot lookups print text or JSON, `serve` runs
//! the HTTP API and `watch` keeps a location on screen, reloading it whenever
//! the offline worker's periodic sync fires.

use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use weatherdash::cli::{Cli, Command};
use weatherdash::config::Config;
use weatherdash::dashboard::{Dashboard, DashboardView};
use weatherdash::data::cities::world_snapshot;
use weatherdash::data::{
    AirQualitySnapshot, CityForecast, ForecastBundle, GeoLocation, LocationData, NewsArticle,
    WeatherSnapshot, MAJOR_CITIES,
};
use weatherdash::server::{self, AppState};
use weatherdash::worker::{HttpNetwork, OfflineWorker, WorkerHandle};

type CliResult<T> = Result<T, Box<dyn Error>>;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weatherdash=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(units) = cli.units {
        config.units = units;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }

    let validation = config.validate();
    for warning in &validation.warnings {
        warn!("Config warning: {}", warning);
    }
    if !validation.is_valid() {
        return Err(format!(
            "Configuration validation failed: {}",
            validation.error_summary()
        )
        .into());
    }

    let json = cli.json;
    match cli.command {
        Command::Current { location } => {
            let weather = config.weather_cache()?.current_weather(&location).await?;
            emit(&weather, json, print_current)?;
        }
        Command::Forecast { location } => {
            let forecast = config.weather_cache()?.forecast(&location).await?;
            emit(&forecast, json, print_forecast)?;
        }
        Command::Air { location } => {
            let air = config.weather_cache()?.air_quality(&location).await?;
            emit(&air, json, print_air_quality)?;
        }
        Command::Search { query } => {
            let matches = config.openweather_client().search_locations(&query).await?;
            emit(matches.as_slice(), json, print_locations)?;
        }
        Command::Geocode { location } => {
            let data = config
                .opencage_client()
                .location_data(&location)
                .await
                .ok_or_else(|| format!("No geocoding result for '{}'", location))?;
            emit(&data, json, print_location_data)?;
        }
        Command::Cities => {
            let cities = world_snapshot(
                &config.openweather_client(),
                &config.unsplash_client(),
                &MAJOR_CITIES,
            )
            .await;
            emit(cities.as_slice(), json, print_cities)?;
        }
        Command::News => {
            let articles = config.news_client().top_headlines().await?;
            emit(articles.as_slice(), json, print_news)?;
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let addr = config.bind_addr()?;
            let state = AppState {
                news: config.news_client(),
            };
            server::serve(addr, state).await?;
        }
        Command::Watch { location } => watch(&config, location, json).await?,
    }

    Ok(())
}

/// Keeps `location` on screen and reloads it on every worker update
async fn watch(config: &Config, location: String, json: bool) -> CliResult<()> {
    let dashboard = Dashboard::new(config.weather_cache()?, location);
    emit(&dashboard.load().await, json, print_view)?;

    let network = Arc::new(HttpNetwork::new(&config.worker.app_origin)?);
    let worker_root = config.resolved_cache_dir()?.join("worker");
    let worker = WorkerHandle::spawn(OfflineWorker::new(
        config.worker_options(),
        &worker_root,
        network,
    ));
    let mut channel = worker.connect().await?;

    // Install or activation failures leave the dashboard usable without updates
    match worker.install().await {
        Ok(()) => {
            if let Err(e) = worker.activate().await {
                warn!(error = %e, "offline worker activation failed");
            }
        }
        Err(e) => warn!(error = %e, "offline worker not installed; periodic updates disabled"),
    }

    let registration = worker
        .register_periodic_sync(
            &config.worker.sync_tag,
            config.sync_interval(),
            config.worker.periodic_sync_permission,
        )
        .ok();

    tokio::select! {
        reloads = dashboard.follow_updates(&mut channel, |view| {
            if let Err(e) = emit(&view, json, print_view) {
                error!(error = %e, "failed to print dashboard");
            }
        }) => {
            info!(reloads, "worker stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    if let Some(registration) = registration {
        registration.shutdown().await;
    }
    Ok(())
}

fn emit<T: Serialize + ?Sized>(value: &T, json: bool, text: fn(&T)) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn print_current(w: &WeatherSnapshot) {
    println!("{}, {}", w.location, w.country);
    println!(
        "  {}{}  (feels like {}{})  {}",
        w.temperature, w.unit, w.feels_like, w.unit, w.description
    );
    println!(
        "  Humidity {}%  Wind {} {}  Pressure {} hPa  Dew point {}{}",
        w.humidity, w.wind_speed, w.wind_speed_unit, w.pressure, w.dew_point, w.unit
    );
    println!(
        "  Visibility {}  Precipitation {}  Sunrise {}  Sunset {}",
        w.visibility,
        w.precipitation,
        w.sunrise.format("%H:%M UTC"),
        w.sunset.format("%H:%M UTC")
    );
}

fn print_forecast(f: &ForecastBundle) {
    println!("Next 24 hours");
    for hour in &f.hourly {
        println!(
            "  {:>5}  {:>4}{}  {}  {} {}",
            hour.time, hour.temperature, f.unit, hour.description, hour.precipitation, f.precipitation_unit
        );
    }
    println!("Daily");
    for day in &f.daily {
        println!(
            "  {:<3}  {:>4}{}  {}  wind {} {}",
            day.date, day.temperature, f.unit, day.description, day.wind_speed, f.wind_speed_unit
        );
    }
}

fn print_air_quality(a: &AirQualitySnapshot) {
    println!("AQI {} ({})", a.aqi, a.label());
    for (name, value) in &a.components {
        println!("  {:<6} {:.2}", name, value);
    }
}

fn print_locations(matches: &[GeoLocation]) {
    if matches.is_empty() {
        println!("No matching locations");
    }
    for m in matches {
        match &m.state {
            Some(state) => println!("{}, {}, {}  ({:.4}, {:.4})", m.name, state, m.country, m.lat, m.lon),
            None => println!("{}, {}  ({:.4}, {:.4})", m.name, m.country, m.lat, m.lon),
        }
    }
}

fn print_location_data(d: &LocationData) {
    println!("{:.4}, {:.4}  {}", d.lat, d.lng, d.timezone);
}

fn print_cities(cities: &[CityForecast]) {
    for c in cities {
        println!(
            "{:<16} {}  {:>4}{}  {}",
            c.weather.location, c.local_time, c.weather.temperature, c.weather.unit, c.weather.description
        );
    }
}

fn print_news(articles: &[NewsArticle]) {
    for a in articles {
        println!("{}\n  {}", a.title, a.url);
    }
}

fn print_view(view: &DashboardView) {
    println!("== {} ({}) ==", view.location, view.loaded_at.format("%H:%M:%S UTC"));
    if let Some(current) = &view.current {
        print_current(current);
    }
    if let Some(forecast) = &view.forecast {
        print_forecast(forecast);
    }
    if let Some(air) = &view.air_quality {
        print_air_quality(air);
    }
    for e in &view.errors {
        println!("! {}", e);
    }
}
