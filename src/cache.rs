//! Soft in-memory cache of parsed feeds keyed by feed id.
//!
//! Entries expire after a fixed TTL (five minutes by default). Concurrent
//! loads of the same feed id are serialized on a per-id lock, so only the
//! first caller reaches the network and the others read its result.

use crate::config::CacheConfig;
use crate::models::Feed;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    feed: Feed,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct FeedCache {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FeedCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl(),
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The cached feed for `id`, if present and younger than the TTL.
    pub async fn get(&self, id: &str) -> Option<Feed> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.lock().await;
        entries
            .get(id)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.feed.clone())
    }

    pub async fn insert(&self, id: &str, feed: Feed) {
        if !self.enabled {
            return;
        }
        self.entries.lock().await.insert(
            id.to_string(),
            CacheEntry {
                feed,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the fresh cached feed for `id`, or run `load` and cache its success.
    ///
    /// Callers racing on the same `id` wait for the one running `load`.
    /// Failures are not cached.
    pub async fn get_or_load<F, Fut, E>(&self, id: &str, load: F) -> Result<Feed, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Feed, E>>,
    {
        if !self.enabled {
            return load().await;
        }

        let lock = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(id.to_string()).or_default())
        };
        let _guard = lock.lock().await;

        if let Some(feed) = self.get(id).await {
            debug!(feed = %id, "Cache hit");
            return Ok(feed);
        }

        let feed = load().await?;
        self.insert(id, feed.clone()).await;
        Ok(feed)
    }
}
