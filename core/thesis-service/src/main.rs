// core/thesis-service/src/main.rs
// Thesis management service: topics, selections, documents and grades over
// a cache-aside read path

mod handlers;
mod middleware;
mod models;
mod repository;
mod services;
mod state;
mod storage;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use prometheus::Registry;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::SystemTime;
use thesis_common::{
    configure_rate_limits, init_logging, retry_with_backoff, start_cleanup_task, CacheMetrics,
    CacheStore, JwtManager, MemoryCacheStore, RateLimitMiddleware, RateLimiter, RedisCacheStore,
    ServiceConfig, ServiceMetrics, ThesisMetrics,
};

use crate::middleware::auth::AuthMiddleware;
use crate::middleware::metrics::MetricsMiddleware;
use crate::repository::{PgStore, Repositories};
use crate::services::{ServiceContext, Services};
use crate::state::AppState;
use crate::storage::LocalFileStorage;

const SERVICE_NAME: &str = "thesis-service";
const STARTUP_ATTEMPTS: u32 = 5;
const STARTUP_DELAY_MS: u64 = 500;

async fn connect_cache(config: &ServiceConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = retry_with_backoff(
                "redis",
                || RedisCacheStore::connect(url),
                STARTUP_ATTEMPTS,
                STARTUP_DELAY_MS,
            )
            .await
            .context("connecting to Redis")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("REDIS_URL not set; using the in-process cache");
            let store = MemoryCacheStore::new();
            thesis_common::cache::start_purge_task(store.clone());
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("loading configuration")?;
    init_logging(SERVICE_NAME, config.log_format);
    tracing::info!(
        environment = ?config.environment,
        port = config.port,
        "Starting {}",
        SERVICE_NAME
    );

    // Database
    let pool = retry_with_backoff(
        "postgres",
        || {
            PgPoolOptions::new()
                .max_connections(10)
                .connect(&config.database_url)
        },
        STARTUP_ATTEMPTS,
        STARTUP_DELAY_MS,
    )
    .await
    .context("connecting to PostgreSQL")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;
    tracing::info!("Database connection established");

    let cache = connect_cache(&config).await?;

    // Prometheus metrics
    let registry = Registry::new();
    let service_metrics = ServiceMetrics::new(&registry, "thesis_service")?;
    let cache_metrics = CacheMetrics::new(&registry)?;
    let thesis_metrics = ThesisMetrics::new(&registry)?;
    tracing::info!("Metrics initialized");

    // Rate limiter
    let mut rate_limiter = RateLimiter::new();
    configure_rate_limits(&mut rate_limiter, config.rate_limit_login_per_minute);
    let rate_limiter = Arc::new(rate_limiter);
    start_cleanup_task(rate_limiter.clone());

    let jwt_manager = JwtManager::new(config.jwt_secret.clone(), config.jwt_ttl_hours);
    let repositories = Repositories::postgres(PgStore::new(pool));
    let probe = repositories.probe.clone();

    let services = Services::new(ServiceContext {
        repositories,
        cache: cache.clone(),
        storage: Arc::new(LocalFileStorage::new(config.storage_root.clone())),
        ttl: config.cache_ttl,
        jwt: jwt_manager.clone(),
        cache_metrics: Some(cache_metrics),
        metrics: Some(thesis_metrics),
    })
    .context("building services")?;

    let state = web::Data::new(AppState {
        services,
        cache: cache.clone(),
        store: probe,
        registry,
        start_time: SystemTime::now(),
    });

    let bind_addr = config.bind_addr();
    tracing::info!(address = %bind_addr.0, port = bind_addr.1, "Starting HTTP server");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        // Last wrap runs first
        App::new()
            .wrap(AuthMiddleware::new(jwt_manager.clone(), cache.clone()))
            .wrap(MetricsMiddleware::new(service_metrics.clone()))
            .wrap(RateLimitMiddleware::new(rate_limiter.clone()))
            .wrap(cors)
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Content-Security-Policy", "default-src 'self'"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .wrap(actix_web::middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
