// core/thesis-service/src/state.rs
// Shared application state handed to every handler

use prometheus::Registry;
use std::sync::Arc;
use std::time::SystemTime;
use thesis_common::CacheStore;

use crate::repository::StoreProbe;
use crate::services::Services;

pub struct AppState {
    pub services: Services,
    pub cache: Arc<dyn CacheStore>,
    pub store: Arc<dyn StoreProbe>,
    pub registry: Registry,
    pub start_time: SystemTime,
}

#[cfg(test)]
impl AppState {
    /// State over the in-process harness stores, for handler tests
    pub fn for_tests(h: &crate::services::fixtures::Harness) -> Self {
        Self {
            services: h.services.clone(),
            cache: Arc::new(h.cache.clone()),
            store: h.store.clone(),
            registry: Registry::new(),
            start_time: SystemTime::now(),
        }
    }
}
