// core/common/src/logging.rs
// Structured logging with correlation IDs

use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use uuid::Uuid;

use crate::auth::Role;
use crate::config::LogFormat;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"))
}

/// Initialize logging: JSON lines in production, pretty output in development.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(service_name: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter());

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true),
            )
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_target(true)).init(),
    }

    info!(service = service_name, format = ?format, "Logging initialized");
}

/// Generate a correlation ID for request tracing
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Context for structured logging
#[derive(Debug, Clone)]
pub struct LogContext {
    pub request_id: String,
    pub user_id: Option<i64>,
    pub role: Option<Role>,
    pub ip_address: Option<String>,
}

impl LogContext {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            user_id: None,
            role: None,
            ip_address: None,
        }
    }
    
    pub fn with_user(mut self, user_id: i64, role: Role) -> Self {
        self.user_id = Some(user_id);
        self.role = Some(role);
        self
    }
    
    pub fn with_ip(mut self, ip: String) -> Self {
        self.ip_address = Some(ip);
        self
    }
}

/// Log authentication attempt
pub fn log_auth_attempt(ctx: &LogContext, username: &str, success: bool) {
    if success {
        info!(
            request_id = %ctx.request_id,
            username = username,
            user_id = ?ctx.user_id,
            role = ?ctx.role,
            ip_address = ?ctx.ip_address,
            "Authentication successful"
        );
    } else {
        warn!(
            request_id = %ctx.request_id,
            attempted_username = username,
            ip_address = ?ctx.ip_address,
            "Authentication failed"
        );
    }
}

/// Log rate limit exceeded
pub fn log_rate_limit_exceeded(ctx: &LogContext, endpoint: &str, key: &str) {
    warn!(
        request_id = %ctx.request_id,
        ip_address = ?ctx.ip_address,
        endpoint = endpoint,
        rate_limit_key = key,
        "Rate limit exceeded"
    );
}

/// Redact secrets and truncate long values (tokens, file payloads) before logging
pub fn sanitize_for_logging(input: &str) -> String {
    if input.len() > 100 {
        let prefix: String = input.chars().take(20).collect();
        format!("{}...[REDACTED]", prefix)
    } else if input.contains("password") || input.contains("secret") || input.contains("Bearer ") {
        "[REDACTED]".to_string()
    } else {
        input.to_string()
    }
}
