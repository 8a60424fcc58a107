// core/common/src/lib.rs
// Thesis management common library: cache-aside layer, auth, errors and service plumbing

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod retry;
pub mod validation;

// Re-export commonly used items
pub use auth::{
    extract_bearer_token, generate_salt, hash_password, session_key, verify_password, AuthError,
    Claims, JwtManager, Role,
};
pub use cache::{
    CacheAside, CacheError, CacheStore, CachedValue, MemoryCacheStore, TtlPolicy,
};
#[cfg(feature = "redis-cache")]
pub use cache::RedisCacheStore;
pub use config::{CacheTtlConfig, ConfigError, Environment, LogFormat, ServiceConfig};
pub use error::{ErrorResponse, ServiceError};
pub use health::{
    check_cache_health, check_database_health, DependencyHealth, HealthResponse, HealthStatus,
    LivenessProbe, ReadinessProbe,
};
pub use logging::{
    generate_request_id, init_logging, log_auth_attempt, LogContext,
};
pub use metrics::{CacheMetrics, MetricsTimer, ServiceMetrics, ThesisMetrics};
pub use middleware::{configure_rate_limits, RateLimitMiddleware};
pub use rate_limit::{start_cleanup_task, RateLimit, RateLimitError, RateLimitInfo, RateLimiter};
pub use retry::retry_with_backoff;
pub use validation::ValidationError;
