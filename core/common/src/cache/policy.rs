// core/common/src/cache/policy.rs
// TTL policy for positive and negative cache entries

use super::store::CacheError;

pub const DEFAULT_NEGATIVE_TTL_SECONDS: u64 = 120;

// Positive TTLs follow how often each entity changes
pub const DEPARTMENT_TTL_SECONDS: u64 = 7200;
pub const USER_TTL_SECONDS: u64 = 3600;
pub const TOPIC_TTL_SECONDS: u64 = 1800;
pub const DOCUMENT_TTL_SECONDS: u64 = 1800;
pub const SELECTION_TTL_SECONDS: u64 = 900;
pub const GRADE_TTL_SECONDS: u64 = 900;

/// TTLs written by a cache-aside read. A negative entry always lives
/// strictly shorter than a positive one of the same entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    positive_seconds: u64,
    negative_seconds: u64,
}

impl TtlPolicy {
    pub fn new(positive_seconds: u64, negative_seconds: u64) -> Result<Self, CacheError> {
        if negative_seconds == 0 {
            return Err(CacheError::Config("negative TTL must be positive".to_string()));
        }
        if negative_seconds >= positive_seconds {
            return Err(CacheError::Config(format!(
                "negative TTL ({}s) must be shorter than positive TTL ({}s)",
                negative_seconds, positive_seconds
            )));
        }
        Ok(Self {
            positive_seconds,
            negative_seconds,
        })
    }

    pub fn positive_seconds(&self) -> u64 {
        self.positive_seconds
    }

    pub fn negative_seconds(&self) -> u64 {
        self.negative_seconds
    }
}
