use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta};

use crate::models::{CacheEntry, DocumentId, ExtractionResult};
use crate::traits::{Clock, KeyValueStore, SystemClock};

/// Prefix of every cache key in the backing store.
pub const CACHE_KEY_PREFIX: &str = "cache_";

/// Stored value layout: `{"data": {"title", "summary"}, "ts": <unix millis>}`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoredEntry {
    data: ExtractionResult,
    ts: i64,
}

/// TTL cache of extraction results on top of a [`KeyValueStore`].
///
/// Store failures are logged and absorbed: a failed read is a miss and a
/// failed write is dropped, so the cache can never fail a request.
#[derive(Clone)]
pub struct ResultCache<S, C = SystemClock> {
    store: S,
    clock: C,
    ttl: TimeDelta,
}

impl<S: KeyValueStore> ResultCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self::with_clock(store, SystemClock, ttl)
    }
}

impl<S: KeyValueStore, C: Clock> ResultCache<S, C> {
    pub fn with_clock(store: S, clock: C, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn key(id: &DocumentId) -> String {
        format!("{CACHE_KEY_PREFIX}{id}")
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh entry for `id`, if any. Stale entries are evicted on the way out.
    pub async fn get(&self, id: &DocumentId) -> Option<CacheEntry> {
        let key = Self::key(id);
        let mut values = match self.store.get(std::slice::from_ref(&key)).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        let value = values.remove(&key)?;

        let stored: StoredEntry = match serde_json::from_value(value) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Ignoring malformed cache entry");
                return None;
            }
        };
        let fetched_at = DateTime::from_timestamp_millis(stored.ts)?;

        let age = self.clock.now() - fetched_at;
        if age >= self.ttl {
            tracing::debug!(%id, age_secs = age.num_seconds(), "Cache entry expired");
            if let Err(e) = self.store.remove(&[key]).await {
                tracing::warn!(%id, error = %e, "Failed to evict expired cache entry");
            }
            return None;
        }

        Some(CacheEntry {
            result: stored.data,
            fetched_at,
        })
    }

    /// Store `result` for `id`, replacing whatever was there.
    pub async fn put(&self, id: &DocumentId, result: &ExtractionResult) {
        let stored = StoredEntry {
            data: result.clone(),
            ts: self.clock.now().timestamp_millis(),
        };
        let value = match serde_json::to_value(&stored) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(HashMap::from([(Self::key(id), value)])).await {
            tracing::warn!(%id, error = %e, "Cache write failed");
        }
    }
}
