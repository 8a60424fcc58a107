// core/common/src/cache/store.rs
// Cache store collaborator: the key-value contract the cache-aside layer relies on

use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    #[error("Cache command failed: {0}")]
    Command(String),
    #[error("Cache payload error: {0}")]
    Payload(String),
    #[error("Invalid cache configuration: {0}")]
    Config(String),
}

/// Key-value store with per-key TTL, used as a look-aside cache.
///
/// Every operation may fail; callers decide whether a failure is fatal.
/// The cache-aside layer never lets a failure here fail a read or a write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Replace any existing value at `key`. `ttl_seconds` must be positive.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Increment the integer counter at `key`, creating it at 1 with the
    /// given TTL when absent. The TTL of an existing counter is kept.
    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<i64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Key for a single entity snapshot: `<namespace>:info:<id>`.
pub fn entity_key(namespace: &str, id: impl Display) -> String {
    format!("{}:info:{}", namespace, id)
}

pub(crate) fn check_ttl(ttl_seconds: u64) -> Result<(), CacheError> {
    if ttl_seconds == 0 {
        return Err(CacheError::Command("ttl must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_format() {
        assert_eq!(entity_key("topic", 42), "topic:info:42");
        assert_eq!(entity_key("department", 7), "department:info:7");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(check_ttl(0).is_err());
        assert!(check_ttl(1).is_ok());
    }
}
