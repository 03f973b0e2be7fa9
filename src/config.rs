//! Configuration file and environment overrides
//!
//! Settings come from `config.toml` in the platform config directory, then
//! API keys and the cache directory may be overridden from the environment
//! (including a `.env` file loaded by the binary).

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::cache::{CacheManager, ResponseCache, DEFAULT_MEMORY_TTL_MINUTES};
use crate::data::geocoding::OPENCAGE_BASE_URL;
use crate::data::images::UNSPLASH_BASE_URL;
use crate::data::news::NEWSAPI_BASE_URL;
use crate::data::weather::OPENWEATHER_BASE_URL;
use crate::data::{NewsClient, OpenCageClient, OpenWeatherClient, UnsplashClient, Units};
use crate::weather_cache::{WeatherCache, PERSISTENT_TTL_MINUTES};
use crate::worker::{PermissionState, WorkerOptions, MIN_SYNC_INTERVAL};

/// Error types for loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No cache directory configured and none could be derived
    #[error("Could not determine a cache directory; set WEATHERDASH_CACHE_DIR")]
    NoCacheDir,

    #[error("Invalid server bind address '{0}'")]
    InvalidBind(String),
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Key and optional host override for one third-party API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    /// Defaults to the provider's public host
    pub base_url: Option<String>,
}

impl ProviderConfig {
    fn key(&self) -> String {
        self.api_key.clone().unwrap_or_default()
    }

    fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url.as_deref().unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openweather: ProviderConfig,
    pub news: ProviderConfig,
    pub unsplash: ProviderConfig,
    pub opencage: ProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a persisted entry counts as fresh
    pub persistent_ttl_minutes: u32,
    /// How long an in-memory response is reused
    pub memory_ttl_minutes: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent_ttl_minutes: PERSISTENT_TTL_MINUTES as u32,
            memory_ttl_minutes: DEFAULT_MEMORY_TTL_MINUTES as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the application shell is served from
    pub app_origin: String,
    pub cache_name: String,
    pub manifest: Vec<String>,
    pub offline_page: String,
    pub sync_tag: String,
    pub sync_interval_minutes: u32,
    /// Whether the host allows periodic background sync
    pub periodic_sync_permission: PermissionState,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let options = WorkerOptions::default();
        Self {
            app_origin: "http://localhost:3000".to_string(),
            cache_name: options.cache_name,
            manifest: options.manifest,
            offline_page: options.offline_page,
            sync_tag: options.sync_tag,
            sync_interval_minutes: (MIN_SYNC_INTERVAL.as_secs() / 60) as u32,
            periodic_sync_permission: PermissionState::Granted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub units: Units,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub worker: WorkerConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Location of `config.toml` in the platform config directory
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "weatherdash").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the config file (if any) and applies environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Reads `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(toml::from_str(&contents)?)
    }

    /// Applies overrides from environment-style variables
    ///
    /// Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("OPENWEATHER_API_KEY") {
            self.providers.openweather.api_key = Some(key);
        }
        if let Some(key) = var("NEWS_API_KEY") {
            self.providers.news.api_key = Some(key);
        }
        if let Some(key) = var("UNSPLASH_ACCESS_KEY") {
            self.providers.unsplash.api_key = Some(key);
        }
        if let Some(key) = var("OPENCAGE_API_KEY") {
            self.providers.opencage.api_key = Some(key);
        }
        if let Some(dir) = var("WEATHERDASH_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.cache.persistent_ttl_minutes == 0 {
            result.add_error("cache.persistent_ttl_minutes", "TTL must be greater than 0");
        }
        if self.cache.memory_ttl_minutes == 0 {
            result.add_error("cache.memory_ttl_minutes", "TTL must be greater than 0");
        }

        match Url::parse(&self.worker.app_origin) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => result.add_error(
                "worker.app_origin",
                format!("URL must use http or https scheme, got: {}", url.scheme()),
            ),
            Err(e) => result.add_error("worker.app_origin", format!("Invalid URL: {}", e)),
        }

        if self.worker.sync_interval_minutes == 0 {
            result.add_error("worker.sync_interval_minutes", "Interval must be greater than 0");
        } else if u64::from(self.worker.sync_interval_minutes) * 60 < MIN_SYNC_INTERVAL.as_secs() {
            result.add_warning(
                "worker.sync_interval_minutes",
                "Periodic sync more often than every 30 minutes; the 30 minute minimum applies",
            );
        }
        if self.worker.periodic_sync_permission != PermissionState::Granted {
            result.add_warning(
                "worker.periodic_sync_permission",
                "Periodic sync not granted; watch will not refresh on its own",
            );
        }
        if !self.worker.manifest.contains(&self.worker.offline_page) {
            result.add_warning(
                "worker.manifest",
                "Offline page is not pre-cached; offline navigations will fail",
            );
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            result.add_error("server.bind", format!("Invalid address: {}", self.server.bind));
        }

        let providers = [
            ("providers.openweather.api_key", &self.providers.openweather, "weather data"),
            ("providers.news.api_key", &self.providers.news, "headlines"),
            ("providers.unsplash.api_key", &self.providers.unsplash, "city photos"),
            ("providers.opencage.api_key", &self.providers.opencage, "timezone lookup"),
        ];
        for (field, provider, feature) in providers {
            if provider.api_key.is_none() {
                result.add_warning(field, format!("Not set - {} will be unavailable", feature));
            }
        }

        result
    }

    /// Directory for persisted weather and worker assets
    pub fn resolved_cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => CacheManager::new()
                .map(|store| store.dir().to_path_buf())
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    pub fn cache_manager(&self) -> Result<CacheManager, ConfigError> {
        Ok(CacheManager::with_dir(self.resolved_cache_dir()?))
    }

    pub fn openweather_client(&self) -> OpenWeatherClient {
        let memory = ResponseCache::new(chrono::Duration::minutes(i64::from(
            self.cache.memory_ttl_minutes,
        )));
        let provider = &self.providers.openweather;
        OpenWeatherClient::new(provider.key(), memory)
            .with_base_url(provider.base_url_or(OPENWEATHER_BASE_URL))
            .with_units(self.units)
    }

    /// Persistent cache in front of a fresh OpenWeather client
    pub fn weather_cache(&self) -> Result<WeatherCache, ConfigError> {
        Ok(WeatherCache::new(self.cache_manager()?, self.openweather_client()).with_ttl(
            chrono::Duration::minutes(i64::from(self.cache.persistent_ttl_minutes)),
        ))
    }

    pub fn news_client(&self) -> NewsClient {
        let provider = &self.providers.news;
        NewsClient::new(provider.key()).with_base_url(provider.base_url_or(NEWSAPI_BASE_URL))
    }

    pub fn unsplash_client(&self) -> UnsplashClient {
        let provider = &self.providers.unsplash;
        UnsplashClient::new(provider.key()).with_base_url(provider.base_url_or(UNSPLASH_BASE_URL))
    }

    pub fn opencage_client(&self) -> OpenCageClient {
        let provider = &self.providers.opencage;
        OpenCageClient::new(provider.key()).with_base_url(provider.base_url_or(OPENCAGE_BASE_URL))
    }

    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            cache_name: self.worker.cache_name.clone(),
            manifest: self.worker.manifest.clone(),
            offline_page: self.worker.offline_page.clone(),
            sync_tag: self.worker.sync_tag.clone(),
        }
    }

    pub fn sync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.worker.sync_interval_minutes) * 60)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.server.bind.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.units, Units::Imperial);
        assert_eq!(config.cache.persistent_ttl_minutes, 30);
        assert_eq!(config.cache.memory_ttl_minutes, 5);
        assert_eq!(config.worker.cache_name, "weather-app-cache-v1");
        assert_eq!(config.worker.offline_page, "/offline.html");
        assert_eq!(config.worker.sync_tag, "update-weather");
        assert_eq!(config.sync_interval(), MIN_SYNC_INTERVAL);
        assert_eq!(config.worker_options(), WorkerOptions::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();

        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
units = "metric"

[providers.openweather]
api_key = "from-file"

[cache]
persistent_ttl_minutes = 60

[worker]
sync_interval_minutes = 45
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.units, Units::Metric);
        assert_eq!(config.providers.openweather.api_key.as_deref(), Some("from-file"));
        assert!(config.providers.openweather.base_url.is_none());
        assert_eq!(config.cache.persistent_ttl_minutes, 60);
        assert_eq!(config.cache.memory_ttl_minutes, 5);
        assert_eq!(config.worker.sync_interval_minutes, 45);
        assert_eq!(config.worker.manifest.len(), 8);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "units = [").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides_keys_and_cache_dir() {
        let mut config = Config::default();
        config.providers.news.api_key = Some("from-file".to_string());

        config.apply_env_from(env(&[
            ("OPENWEATHER_API_KEY", "ow"),
            ("NEWS_API_KEY", "news"),
            ("UNSPLASH_ACCESS_KEY", ""),
            ("WEATHERDASH_CACHE_DIR", "/tmp/wd"),
        ]));

        assert_eq!(config.providers.openweather.api_key.as_deref(), Some("ow"));
        assert_eq!(config.providers.news.api_key.as_deref(), Some("news"));
        assert!(config.providers.unsplash.api_key.is_none(), "Empty values are ignored");
        assert!(config.providers.opencage.api_key.is_none());
        assert_eq!(config.resolved_cache_dir().unwrap(), PathBuf::from("/tmp/wd"));
    }

    #[test]
    fn test_default_config_is_valid_with_key_warnings() {
        let result = Config::default().validate();

        assert!(result.is_valid(), "{}", result.error_summary());
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.cache.persistent_ttl_minutes = 0;
        config.worker.app_origin = "not a url".to_string();
        config.server.bind = "localhost".to_string();

        let result = config.validate();

        assert!(!result.is_valid());
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["cache.persistent_ttl_minutes", "worker.app_origin", "server.bind"]
        );
        assert!(result.error_summary().contains("TTL must be greater than 0"));
        assert!(matches!(config.bind_addr(), Err(ConfigError::InvalidBind(_))));
    }

    #[test]
    fn test_short_sync_interval_warns() {
        let mut config = Config::default();
        config.worker.sync_interval_minutes = 10;
        config.worker.manifest.retain(|p| p != "/offline.html");

        let result = config.validate();

        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "worker.sync_interval_minutes"));
        assert!(result.warnings.iter().any(|w| w.field == "worker.manifest"));
    }

    #[test]
    fn test_periodic_sync_permission_from_file() {
        assert_eq!(Config::default().worker.periodic_sync_permission, PermissionState::Granted);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[worker]\nperiodic_sync_permission = \"denied\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.worker.periodic_sync_permission, PermissionState::Denied);
        assert_eq!(config.worker.sync_tag, "update-weather");
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "worker.periodic_sync_permission"));
    }

    #[tokio::test]
    async fn test_weather_cache_uses_configured_directory() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache_dir = Some(dir.path().to_path_buf());

        let store = config.cache_manager().unwrap();
        store.write("sample", &1u8).await.unwrap();

        assert!(dir.path().join("sample.json").exists());
        assert!(config.weather_cache().is_ok());
    }
}
