//! Provider response caches.
//!
//! Successful provider responses are kept for a fixed time after they were
//! fetched. Failures are never stored.

use dashmap::DashMap;
use serde_json::Value;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::geo::CitySuggestion;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct TtlCache<K, V> {
    entries: DashMap<K, Expiring<V>>,
    ttl: Duration,
}

struct Expiring<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Expiring<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Live value for `key`. An expired entry is dropped on the way out,
    /// unless a fresh one replaced it in the meantime.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    /// Store a fresh response, replacing whatever was there
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Expiring {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop expired entries; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Entry count, expired entries included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Raw provider weather bodies keyed by [`crate::weather::WeatherQuery::cache_key`]
pub type WeatherCache = Arc<TtlCache<String, Value>>;

/// Geocoding results keyed by normalized query text
pub type GeoCache = Arc<TtlCache<String, Vec<CitySuggestion>>>;

pub fn create_weather_cache(ttl: Duration) -> WeatherCache {
    Arc::new(TtlCache::new(ttl))
}

pub fn create_geo_cache(ttl: Duration) -> GeoCache {
    Arc::new(TtlCache::new(ttl))
}

/// Case- and whitespace-insensitive key for free-text lookups
pub fn normalize_cache_key(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Purge expired provider responses from both caches every hour
pub fn start_cache_cleanup_task(weather_cache: WeatherCache, geo_cache: GeoCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let weather_removed = weather_cache.purge_expired();
            let geo_removed = geo_cache.purge_expired();
            if weather_removed + geo_removed > 0 {
                tracing::debug!(
                    weather_removed,
                    geo_removed,
                    weather_remaining = weather_cache.len(),
                    geo_remaining = geo_cache.len(),
                    "Provider cache cleanup completed"
                );
            }
        }
    });
}
