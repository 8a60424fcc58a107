// core/thesis-service/src/middleware/mod.rs

pub mod auth;
pub mod metrics;
