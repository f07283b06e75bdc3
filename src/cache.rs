use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval};

use crate::metrics::CACHE_SIZE;
use crate::models::CacheKey;

// Reference deployment values
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// Cache entry with absolute expiry
#[derive(Clone)]
pub struct CacheEntry {
    pub body: Bytes,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Upstream payloads keyed by normalized query. Entries are replaced whole,
/// so readers see either the old body or the new one.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let now = Instant::now();

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.body.clone()),
            Some(_) => {}
            None => return None,
        }

        // Read guard is gone here; recheck in case a fresh set raced us
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    // An expiry that would overflow Instant falls back to MAX_TTL
    pub fn set(&self, key: CacheKey, body: Bytes, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL);

        self.entries.insert(key, CacheEntry { body, expires_at });
    }

    // Drops every expired entry, returns how many went
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Background sweep of expired entries
pub async fn cache_janitor(cache: Arc<ResponseCache>, every: Duration) {
    let mut interval = interval(every);
    // first tick fires immediately, nothing to sweep yet
    interval.tick().await;

    tracing::info!(interval = ?every, "Cache janitor started");

    loop {
        interval.tick().await;

        let removed = cache.purge_expired();
        CACHE_SIZE.set(cache.len() as f64);

        if removed > 0 {
            tracing::debug!(removed, remaining = cache.len(), "Purged expired cache entries");
        }
    }
}
