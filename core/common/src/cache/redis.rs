// core/common/src/cache/redis.rs
// Redis-backed cache store

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{RedisError, Script};

use super::store::{check_ttl, CacheError, CacheStore};

static INCR_WITH_TTL: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        local count = redis.call('INCR', KEYS[1])
        if redis.call('TTL', KEYS[1]) < 0 then
            redis.call('EXPIRE', KEYS[1], ARGV[1])
        end
        return count
        ",
    )
});

#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(map_redis_error)?;
        let manager = ConnectionManager::new(client).await.map_err(map_redis_error)?;

        tracing::info!("Redis cache connection established");
        Ok(Self { manager })
    }
}

fn map_redis_error(err: RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::Command(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError> {
        check_ttl(ttl_seconds)?;
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value.as_slice())
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_redis_error)
    }

    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<i64, CacheError> {
        check_ttl(ttl_seconds)?;
        let mut conn = self.manager.clone();
        // One server-side step: a counter never outlives its window, and a
        // key left without a TTL gets one on the next increment
        INCR_WITH_TTL
            .key(key)
            .arg(ttl_seconds)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_redis_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn live_store() -> Option<RedisCacheStore> {
        let url = std::env::var("REDIS_TEST_URL").ok()?;
        RedisCacheStore::connect(&url).await.ok()
    }

    async fn ttl(store: &RedisCacheStore, key: &str) -> i64 {
        let mut conn = store.manager.clone();
        redis::cmd("TTL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "needs REDIS_TEST_URL"]
    async fn test_incr_always_leaves_a_ttl() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = format!("test:incr:{}", uuid::Uuid::new_v4());

        assert_eq!(store.incr(&key, 900).await.unwrap(), 1);
        assert!(ttl(&store, &key).await > 0);

        // A counter that lost its TTL is repaired by the next increment
        let mut conn = store.manager.clone();
        redis::cmd("PERSIST")
            .arg(&key)
            .query_async::<_, i64>(&mut conn)
            .await
            .unwrap();
        assert_eq!(ttl(&store, &key).await, -1);
        assert_eq!(store.incr(&key, 900).await.unwrap(), 2);
        assert!(ttl(&store, &key).await > 0);

        store.delete(&key).await.unwrap();
    }

    #[test]
    fn test_refused_connection_maps_to_unavailable() {
        let err = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(map_redis_error(err), CacheError::Unavailable(_)));
    }
}
