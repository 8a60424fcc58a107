// core/common/src/cache/memory.rs
// In-process cache store with per-entry expiry (tests and local development)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::store::{check_ttl, CacheError, CacheStore};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Instant,
    ttl_seconds: u64,
}

impl MemoryEntry {
    fn new(value: Vec<u8>, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            ttl_seconds,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL the live entry at `key` was written with.
    pub async fn ttl_of(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.ttl_seconds)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.ttl_of(key).await.is_some()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired entries; reads already ignore them.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError> {
        check_ttl(ttl_seconds)?;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), MemoryEntry::new(value, ttl_seconds));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<i64, CacheError> {
        check_ttl(ttl_seconds)?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let live = entries.get(key).filter(|entry| !entry.is_expired(now)).cloned();
        let next = match live {
            Some(mut entry) => {
                let current: i64 = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| {
                        CacheError::Command(format!("value at {} is not an integer", key))
                    })?;
                let next = current + 1;
                entry.value = next.to_string().into_bytes();
                entries.insert(key.to_string(), entry);
                next
            }
            None => {
                entries.insert(key.to_string(), MemoryEntry::new(b"1".to_vec(), ttl_seconds));
                1
            }
        };

        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Periodically drop expired entries from an in-process store.
pub fn start_purge_task(store: MemoryCacheStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged = purged, "Purged expired cache entries");
            }
        }
    });
}
