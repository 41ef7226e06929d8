//! Rating Cache - memoizes the month-to-date rating behind a TTL
//!
//! The snapshot is stored verbatim in the key-value store under
//! `rating_cache`. A malformed payload is treated as a miss; explicit
//! invalidation happens on every mutating operation, before the next
//! read.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::date_key::Clock;
use super::models::RatingSnapshot;
use super::store::KvStore;

const CACHE_KEY: &str = "rating_cache";

/// Default time-to-live for a cached snapshot
pub const DEFAULT_TTL_HOURS: u64 = 24;

#[derive(Clone)]
pub struct RatingCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl RatingCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, ttl_hours: u64) -> Self {
        Self {
            store,
            clock,
            ttl_ms: (ttl_hours as i64) * 60 * 60 * 1000,
        }
    }

    /// Fresh snapshot if one exists and is within the TTL
    pub fn get(&self) -> Option<RatingSnapshot> {
        let snapshot = match self.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                // Corrupt cache payload: treat as a miss, recompute
                tracing::warn!("Unreadable rating cache, treating as miss: {e:#}");
                return None;
            }
        };

        let age = self.clock.now_ms() - snapshot.captured_at;
        if age >= 0 && age < self.ttl_ms {
            tracing::debug!("Rating cache hit (age {age}ms)");
            Some(snapshot)
        } else {
            tracing::debug!("Rating cache expired (age {age}ms)");
            None
        }
    }

    /// Store a freshly computed snapshot
    pub fn put(&self, snapshot: &RatingSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("Failed to serialize rating cache")?;
        self.store.set(CACHE_KEY, &json)
    }

    /// Unconditionally clear the stored snapshot. Called by every
    /// mutating operation; failures are logged and swallowed so a cache
    /// problem never fails a save.
    pub fn invalidate(&self) {
        if let Err(e) = self.store.remove(CACHE_KEY) {
            tracing::warn!("Failed to invalidate rating cache: {e:#}");
        }
    }

    fn load(&self) -> Result<Option<RatingSnapshot>> {
        let Some(json) = self.store.get(CACHE_KEY)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&json).context("Malformed rating cache payload")?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::date_key::FixedClock;
    use crate::stats::store::MemoryStore;
    use chrono::TimeZone;

    fn setup() -> (Arc<MemoryStore>, Arc<FixedClock>, RatingCache) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            chrono::Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap(),
        ));
        let cache = RatingCache::new(store.clone(), clock.clone(), DEFAULT_TTL_HOURS);
        (store, clock, cache)
    }

    #[test]
    fn test_hit_within_ttl() {
        let (_, clock, cache) = setup();
        let snapshot = RatingSnapshot::zero(clock.now_ms());
        cache.put(&snapshot).unwrap();

        clock.advance_hours(23);
        assert_eq!(cache.get(), Some(snapshot));
    }

    #[test]
    fn test_expired_after_ttl() {
        let (_, clock, cache) = setup();
        cache.put(&RatingSnapshot::zero(clock.now_ms())).unwrap();

        clock.advance_hours(25);
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_invalidate_clears() {
        let (_, clock, cache) = setup();
        cache.put(&RatingSnapshot::zero(clock.now_ms())).unwrap();
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_malformed_payload_is_a_miss() {
        let (store, _, cache) = setup();
        store.set("rating_cache", "{broken").unwrap();
        assert_eq!(cache.get(), None);
    }
}
