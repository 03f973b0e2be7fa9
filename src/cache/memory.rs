//! In-memory response cache shared by the fetchers
//!
//! Entries live for the lifetime of the process and are considered usable for
//! a fixed TTL (five minutes by default). Construct one at startup and hand
//! clones to every client; clones share the same map.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{system_clock, Clock};

/// Default lifetime of an in-memory entry
pub const DEFAULT_MEMORY_TTL_MINUTES: i64 = 5;

struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: DateTime<Utc>,
}

/// Process-local key → (value, timestamp) map with a fixed TTL
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<HashMap<String, Slot>>>,
    ttl: Duration,
    clock: Clock,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.lock().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_MEMORY_TTL_MINUTES))
    }
}

impl ResponseCache {
    /// Creates an empty cache whose entries are usable for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock: system_clock(),
        }
    }

    /// Replaces the time source used to stamp and age entries
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the stored value if it is younger than the TTL
    ///
    /// A value stored under `key` with a different type is treated as absent.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        let now = (self.clock)();
        let entries = self.entries.lock();
        let slot = entries.get(key)?;
        if now - slot.stored_at >= self.ttl {
            return None;
        }
        slot.value.downcast_ref::<T>().cloned()
    }

    /// Stores `value` under `key`, replacing anything already there
    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        let slot = Slot {
            value: Arc::new(value),
            stored_at: (self.clock)(),
        };
        self.entries.lock().insert(key.into(), slot);
    }

    /// Number of entries held, expired ones included
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
