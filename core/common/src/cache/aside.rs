// core/common/src/cache/aside.rs
// Cache-aside reads with negative caching, and invalidation after writes

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::policy::TtlPolicy;
use super::store::{entity_key, CacheStore};
use super::value::CachedValue;
use crate::metrics::{CacheMetrics, MetricsTimer};

enum Lookup<V> {
    Present(V),
    Absent,
    Miss,
}

/// Read-through cache for one entity type.
///
/// `get_by_id` checks the cache, falls back to the loader on a miss and
/// records either the snapshot (positive TTL) or an absent marker
/// (negative TTL). Cache failures never fail a call: a failed read is a
/// miss, a failed write or delete is logged and dropped. Loader errors
/// propagate unchanged and leave the cache untouched.
///
/// There is no coordination with the persistent store. A read that loaded
/// before a write committed may repopulate the key right after the write's
/// invalidation; the entry then stays stale until its TTL runs out.
pub struct CacheAside<T> {
    store: Arc<dyn CacheStore>,
    namespace: &'static str,
    policy: TtlPolicy,
    metrics: Option<CacheMetrics>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for CacheAside<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            namespace: self.namespace,
            policy: self.policy,
            metrics: self.metrics.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> CacheAside<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn CacheStore>, namespace: &'static str, policy: TtlPolicy) -> Self {
        Self {
            store,
            namespace,
            policy,
            metrics: None,
            _entity: PhantomData,
        }
    }

    pub fn with_metrics(mut self, metrics: CacheMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    pub fn key<I: Display>(&self, id: &I) -> String {
        entity_key(self.namespace, id)
    }

    /// Cached projection of the entity with `id`, loading it on a miss.
    ///
    /// A `None` id returns `Ok(None)` without touching the cache or the
    /// store. Each call performs at most one cache write and one load.
    pub async fn get_by_id<I, F, Fut, E>(&self, id: Option<I>, loader: F) -> Result<Option<T>, E>
    where
        I: Display,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let Some(id) = id else {
            return Ok(None);
        };

        let key = self.key(&id);
        match self.lookup::<T>(&key).await {
            Lookup::Present(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }

        let timer = MetricsTimer::new();
        let loaded = match loader(id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                self.record_load("error", timer.elapsed_seconds());
                return Err(err);
            }
        };

        match &loaded {
            Some(value) => {
                self.record_load("found", timer.elapsed_seconds());
                self.write(&key, &CachedValue::Present(value), self.policy.positive_seconds())
                    .await;
            }
            None => {
                self.record_load("absent", timer.elapsed_seconds());
                self.write(&key, &CachedValue::<&T>::Absent, self.policy.negative_seconds())
                    .await;
            }
        }

        Ok(loaded)
    }

    /// Cached collection stored under a fixed key, rebuilt lazily on a miss.
    /// An empty collection is cached like any other.
    pub async fn get_collection<F, Fut, E>(&self, key: &str, loader: F) -> Result<Vec<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        if let Lookup::Present(values) = self.lookup::<Vec<T>>(key).await {
            return Ok(values);
        }

        let timer = MetricsTimer::new();
        let loaded = match loader().await {
            Ok(loaded) => loaded,
            Err(err) => {
                self.record_load("error", timer.elapsed_seconds());
                return Err(err);
            }
        };
        self.record_load("found", timer.elapsed_seconds());

        self.write(key, &CachedValue::Present(&loaded), self.policy.positive_seconds())
            .await;
        Ok(loaded)
    }

    /// Remove the cached entry for `id`. Idempotent and infallible.
    pub async fn invalidate<I: Display>(&self, id: &I) {
        let key = self.key(id);
        self.delete_key(&key).await;
    }

    /// Drop a collection cached under `key` by `get_collection`.
    pub async fn invalidate_collection(&self, key: &str) {
        self.delete_key(key).await;
    }

    async fn delete_key(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => {
                tracing::debug!(cache_key = key, "Cache entry invalidated");
                if let Some(metrics) = &self.metrics {
                    metrics.record_invalidation(self.namespace);
                }
            }
            Err(e) => {
                tracing::warn!(
                    cache_key = key,
                    error = %e,
                    "Cache invalidation failed; entry expires by TTL"
                );
                self.record_error("delete");
            }
        }
    }

    async fn lookup<V: DeserializeOwned>(&self, key: &str) -> Lookup<V> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.record_lookup("miss");
                return Lookup::Miss;
            }
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "Cache read failed; loading from store");
                self.record_error("get");
                self.record_lookup("miss");
                return Lookup::Miss;
            }
        };

        match CachedValue::<V>::decode(&bytes) {
            Ok(CachedValue::Present(value)) => {
                tracing::debug!(cache_key = key, "Cache hit");
                self.record_lookup("hit");
                Lookup::Present(value)
            }
            Ok(CachedValue::Absent) => {
                tracing::debug!(cache_key = key, "Cache hit on absent marker");
                self.record_lookup("negative_hit");
                Lookup::Absent
            }
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "Undecodable cache entry; reloading");
                self.record_error("decode");
                self.record_lookup("miss");
                Lookup::Miss
            }
        }
    }

    async fn write<V: Serialize>(&self, key: &str, value: &CachedValue<V>, ttl_seconds: u64) {
        let bytes = match value.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "Cache entry could not be encoded");
                self.record_error("encode");
                return;
            }
        };

        if let Err(e) = self.store.set(key, bytes, ttl_seconds).await {
            tracing::warn!(cache_key = key, error = %e, "Cache write failed");
            self.record_error("set");
        }
    }

    fn record_lookup(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_lookup(self.namespace, outcome);
        }
    }

    fn record_load(&self, result: &str, duration: f64) {
        if let Some(metrics) = &self.metrics {
            metrics.record_load(self.namespace, result, duration);
        }
    }

    fn record_error(&self, operation: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(self.namespace, operation);
        }
    }
}
