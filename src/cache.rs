//! Single-value cache with a time-to-live.
//!
//! Holds `(value, stored_at, ttl)` and refreshes through a caller-supplied
//! loader once the entry is older than `ttl`. The lock is held while the loader
//! runs, so concurrent callers that find the entry stale wait for one refresh
//! instead of each issuing their own.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    slot: Mutex<Option<CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// A zero `ttl` disables caching: every read refreshes.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the fresh cached value or runs `refresh` and stores its result.
    ///
    /// A failed refresh leaves the slot untouched and is returned to the
    /// caller unchanged.
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref()
            && entry.stored_at.elapsed() < self.ttl
        {
            return Ok(entry.value.clone());
        }

        let value = refresh().await?;
        *slot = Some(CacheEntry {
            value: value.clone(),
            stored_at: Instant::now(),
        });

        Ok(value)
    }
}
