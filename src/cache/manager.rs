//! Cache manager for persisting API responses to disk
//!
//! Provides a `CacheManager` that stores serializable data as JSON envelopes of
//! `{ data, timestamp }`, supporting graceful degradation when APIs are unavailable.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

use super::{system_clock, Clock};

/// Distinguishes concurrent temp files for the same key
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Errors that can occur when writing to the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Data could not be serialized
    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Envelope stored on disk for every key
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// When the data was cached, in epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

/// Result of reading from cache, including metadata about cache freshness
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is at least `ttl` old
    pub is_expired: bool,
}

/// Manages reading and writing cached data to disk
///
/// The cache manager stores data as JSON files in an XDG-compliant cache directory
/// (`~/.cache/weatherdash/` on Linux). Freshness is judged at read time against
/// the TTL the caller asks for, and expired entries are still returned (with
/// `is_expired = true`) so that stale data can stand in for a failed fetch.
/// Entries are never deleted, only overwritten.
#[derive(Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    clock: Clock,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Creates a new CacheManager using XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "weatherdash")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            clock: system_clock(),
        }
    }

    /// Replaces the time source used to stamp and age entries
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Current time according to this cache's clock
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Returns the path to a cache file for the given key
    ///
    /// Keys are percent-encoded so that any location string maps to a single,
    /// distinct file name.
    pub(crate) fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", urlencoding::encode(key)))
    }

    /// Writes data to the cache, stamped with the current time
    ///
    /// The envelope is written to a temporary file and renamed into place, so a
    /// reader sees either the previous entry or the new one, never a partial file.
    pub async fn write<T: Serialize>(&self, key: &str, data: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).await?;

        let entry = CacheEntry {
            data,
            timestamp: self.now(),
        };
        let json = serde_json::to_vec(&entry)?;

        let path = self.cache_path(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Reads data from the cache
    ///
    /// Returns `None` if the entry doesn't exist or cannot be read or parsed; a
    /// corrupt entry is logged and otherwise behaves exactly like a missing one.
    /// Returns `Some(CachedData)` with `is_expired = true` if the entry is at
    /// least `ttl` old.
    pub async fn read<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<CachedData<T>> {
        let content = match fs::read(self.cache_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "ignoring unparsable cache entry");
                return None;
            }
        };

        let age = self.now() - entry.timestamp;

        Some(CachedData {
            data: entry.data,
            cached_at: entry.timestamp,
            is_expired: age >= ttl,
        })
    }
}
