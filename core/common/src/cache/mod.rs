// core/common/src/cache/mod.rs
// Look-aside cache with negative caching

pub mod aside;
pub mod memory;
pub mod policy;
#[cfg(feature = "redis-cache")]
pub mod redis;
pub mod store;
pub mod value;

pub use aside::CacheAside;
pub use memory::{start_purge_task, MemoryCacheStore};
pub use policy::TtlPolicy;
#[cfg(feature = "redis-cache")]
pub use self::redis::RedisCacheStore;
pub use store::{entity_key, CacheError, CacheStore};
pub use value::CachedValue;
