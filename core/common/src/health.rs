// core/common/src/health.rs
// Health, liveness and readiness reporting

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::{Duration, Instant, SystemTime};

use crate::cache::CacheStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub features: Vec<String>,
    pub dependencies: Vec<DependencyHealth>,
}

impl HealthResponse {
    pub fn new(service: String, version: String, start_time: SystemTime) -> Self {
        let uptime = SystemTime::now()
            .duration_since(start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();
        
        Self {
            status: HealthStatus::Healthy,
            service,
            version,
            uptime_seconds: uptime,
            features: Vec::new(),
            dependencies: Vec::new(),
        }
    }
    
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }
    
    pub fn add_dependency(&mut self, dependency: DependencyHealth) {
        self.dependencies.push(dependency);
        self.update_overall_status();
    }
    
    fn update_overall_status(&mut self) {
        if self.dependencies.is_empty() {
            return;
        }
        
        let has_unhealthy = self.dependencies.iter().any(|d| d.status == HealthStatus::Unhealthy);
        let has_degraded = self.dependencies.iter().any(|d| d.status == HealthStatus::Degraded);
        
        if has_unhealthy {
            self.status = HealthStatus::Unhealthy;
        } else if has_degraded {
            self.status = HealthStatus::Degraded;
        } else {
            self.status = HealthStatus::Healthy;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyHealth {
    pub name: String,
    pub status: HealthStatus,
    pub latency_ms: Option<u64>,
    pub message: Option<String>,
}

impl DependencyHealth {
    pub fn new(name: String, status: HealthStatus) -> Self {
        Self {
            name,
            status,
            latency_ms: None,
            message: None,
        }
    }
    
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
    
    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

fn latency_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Check database health
pub async fn check_database_health(pool: &PgPool) -> DependencyHealth {
    let start = Instant::now();

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => {
            let latency = latency_ms(start);
            let status = if latency > 1000 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            };

            DependencyHealth::new("database".to_string(), status).with_latency(latency)
        }
        Err(e) => DependencyHealth::new("database".to_string(), HealthStatus::Unhealthy)
            .with_message(format!("Database error: {}", e)),
    }
}

/// Check the look-aside cache. Reads fall back to the database when the
/// cache is down, so an unreachable cache only degrades the service.
pub async fn check_cache_health(store: &dyn CacheStore) -> DependencyHealth {
    let start = Instant::now();

    match store.ping().await {
        Ok(()) => {
            let latency = latency_ms(start);
            let status = if latency > 500 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            };

            DependencyHealth::new("cache".to_string(), status).with_latency(latency)
        }
        Err(e) => DependencyHealth::new("cache".to_string(), HealthStatus::Degraded)
            .with_message(format!("Cache error: {}", e)),
    }
}

/// Liveness probe - is the service running?
#[derive(Debug, Clone, Serialize)]
pub struct LivenessProbe {
    pub alive: bool,
}

impl LivenessProbe {
    pub fn healthy() -> Self {
        Self { alive: true }
    }
}

/// Readiness probe - is the service ready to accept traffic?
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessProbe {
    pub ready: bool,
    pub dependencies_ready: bool,
}

impl ReadinessProbe {
    pub fn new(dependencies_ready: bool) -> Self {
        Self {
            ready: dependencies_ready,
            dependencies_ready,
        }
    }
    
    /// Ready unless some dependency is unhealthy
    pub fn from_dependencies(dependencies: &[DependencyHealth]) -> Self {
        Self::new(dependencies.iter().all(|d| d.status != HealthStatus::Unhealthy))
    }
}
