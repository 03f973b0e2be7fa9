//! Cache module for storing API responses
//!
//! Two layers live here. [`CacheManager`] persists `{data, timestamp}` envelopes
//! to disk and keeps expired entries around so callers can fall back to stale
//! data when a provider is unavailable. [`ResponseCache`] is the short-lived
//! in-memory map the fetchers consult before issuing a request.

mod manager;
mod memory;

pub use manager::{CacheError, CacheManager, CachedData};
pub use memory::{ResponseCache, DEFAULT_MEMORY_TTL_MINUTES};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Time source used to stamp and age cache entries
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The wall clock
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
