//! Offline worker
//!
//! A background execution context that sits between the dashboard and the
//! network. It pre-caches the application shell on install, claims connected
//! clients on activate, answers asset and navigation requests (serving the
//! offline page when the network is gone) and, when woken by the periodic
//! sync timer, tells every client it controls to refresh its weather data.
//!
//! The worker runs as its own task. The application talks to it only through
//! [`WorkerHandle`] requests and receives [`WorkerMessage`]s on a
//! [`ClientChannel`]; no state is shared between the two sides.

mod assets;
mod offline;
mod runtime;

pub use assets::{AssetCache, HttpNetwork, Network};
pub use offline::{OfflineWorker, WorkerState};
pub use runtime::{ClientChannel, SyncRegistration, WorkerHandle};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Tag the periodic sync registration uses
pub const UPDATE_WEATHER_TAG: &str = "update-weather";

/// Shortest interval at which the host will wake the worker
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// How a request was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load
    Navigate,
    /// Anything else: scripts, images, API calls
    Other,
}

/// A request routed through the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    /// Origin-relative path, e.g. "/icons/forecast.png"
    pub path: String,
    pub mode: RequestMode,
}

impl AssetRequest {
    pub fn navigate(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: RequestMode::Navigate,
        }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: RequestMode::Other,
        }
    }
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseSource {
    Network,
    Cache,
}

/// A response produced by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl AssetResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Message broadcast from the worker to connected clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// New weather data should be fetched
    WeatherUpdate,
}

/// Answer to a background permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Static settings for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Name of the versioned asset cache
    pub cache_name: String,
    /// Paths fetched and stored during install
    pub manifest: Vec<String>,
    /// Page served for navigations while offline
    pub offline_page: String,
    /// Periodic sync tag that triggers a weather update
    pub sync_tag: String,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        let offline_page = "/offline.html".to_string();
        Self {
            cache_name: "weather-app-cache-v1".to_string(),
            manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/icons/icon-192x192.png".to_string(),
                "/icons/icon-512x512.png".to_string(),
                "/icons/current-weather.png".to_string(),
                "/icons/forecast.png".to_string(),
                offline_page.clone(),
            ],
            offline_page,
            sync_tag: UPDATE_WEATHER_TAG.to_string(),
        }
    }
}

/// Errors raised by the offline worker
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Request never produced a response
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Network is unreachable
    #[error("Network unavailable: {0}")]
    Unreachable(String),

    #[error("Invalid asset URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An asset listed in the manifest could not be cached
    #[error("Failed to cache {path}: status {status}")]
    AssetStatus { path: String, status: u16 },

    #[error("Asset cache I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Asset cache metadata invalid: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Offline and the offline page was never cached
    #[error("Offline and no cached offline page")]
    OfflinePageMissing,

    #[error("Worker is not installed")]
    NotInstalled,

    #[error("Permission for {0} not granted")]
    PermissionDenied(&'static str),

    #[error("Periodic sync interval must be greater than zero")]
    InvalidInterval,

    /// The worker task has shut down
    #[error("Worker stopped")]
    Stopped,
}
