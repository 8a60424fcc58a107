// core/common/src/rate_limit.rs
// Sliding-window rate limiting, keyed by endpoint and client

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    LimitExceeded { retry_after: u64 },
    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RateLimit {
    pub requests_per_window: u32,
    pub window_seconds: u64,
}

impl RateLimit {
    pub fn new(requests_per_window: u32, window_seconds: u64) -> Self {
        Self {
            requests_per_window,
            window_seconds,
        }
    }
    
    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, 60)
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    timestamps: Vec<u64>,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }
    
    fn add_request(&mut self, now: u64) {
        self.timestamps.push(now);
    }
    
    fn cleanup_old_requests(&mut self, window_start: u64) {
        self.timestamps.retain(|&ts| ts >= window_start);
    }
    
    fn request_count(&self) -> usize {
        self.timestamps.len()
    }
}

pub struct RateLimiter {
    limits: HashMap<String, RateLimit>,
    entries: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            limits: HashMap::new(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
    
    /// Add a rate limit for a specific endpoint
    pub fn add_limit(&mut self, endpoint: String, limit: RateLimit) {
        self.limits.insert(endpoint, limit);
    }

    pub fn is_limited(&self, endpoint: &str) -> bool {
        self.limits.contains_key(endpoint)
    }

    /// Check if request is allowed for given key (client address)
    pub async fn check_rate_limit(
        &self,
        endpoint: &str,
        key: &str,
    ) -> Result<RateLimitInfo, RateLimitError> {
        let limit = self.limits.get(endpoint).ok_or_else(|| {
            RateLimitError::InternalError(format!("No rate limit configured for {}", endpoint))
        })?;
        
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RateLimitError::InternalError(e.to_string()))?
            .as_secs();
        
        let window_start = now.saturating_sub(limit.window_seconds);
        let rate_key = format!("{}:{}", endpoint, key);
        
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(rate_key.clone())
            .or_insert_with(RateLimitEntry::new);
        
        // Clean up old requests outside the window
        entry.cleanup_old_requests(window_start);
        
        let current_count = entry.request_count();
        
        if current_count >= limit.requests_per_window as usize {
            let oldest_request = entry.timestamps.first().copied().unwrap_or(now);
            let retry_after = (oldest_request + limit.window_seconds).saturating_sub(now);
            
            return Err(RateLimitError::LimitExceeded { retry_after });
        }
        
        // Add current request
        entry.add_request(now);
        
        Ok(RateLimitInfo {
            limit: limit.requests_per_window,
            remaining: limit.requests_per_window - (current_count as u32 + 1),
            reset: now + limit.window_seconds,
        })
    }
    
    /// Drop timestamps outside every window, then empty entries
    pub async fn cleanup_old_entries(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let longest_window = self
            .limits
            .values()
            .map(|l| l.window_seconds)
            .max()
            .unwrap_or(0);

        let mut entries = self.entries.write().await;
        for entry in entries.values_mut() {
            entry.cleanup_old_requests(now.saturating_sub(longest_window));
        }
        entries.retain(|_, entry| !entry.timestamps.is_empty());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

impl RateLimitInfo {
    /// Generate HTTP headers for rate limiting
    pub fn to_headers(&self) -> Vec<(String, String)> {
        vec![
            ("X-RateLimit-Limit".to_string(), self.limit.to_string()),
            ("X-RateLimit-Remaining".to_string(), self.remaining.to_string()),
            ("X-RateLimit-Reset".to_string(), self.reset.to_string()),
        ]
    }
}

/// Start background cleanup task
pub fn start_cleanup_task(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.cleanup_old_entries().await;
        }
    });
}
