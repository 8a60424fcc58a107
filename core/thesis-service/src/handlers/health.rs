// core/thesis-service/src/handlers/health.rs
// Health check endpoints

use actix_web::{http::StatusCode, web, HttpResponse, Result};
use thesis_common::{check_cache_health, HealthResponse, LivenessProbe, ReadinessProbe};

use crate::state::AppState;

/// Health check endpoint - comprehensive service health
pub async fn health_check(data: web::Data<AppState>) -> Result<HttpResponse> {
    let mut health = HealthResponse::new(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
        data.start_time,
    )
    .with_features(vec![
        "cache-aside".to_string(),
        "negative-caching".to_string(),
        "captcha-login".to_string(),
    ]);

    health.add_dependency(data.store.health().await);
    health.add_dependency(check_cache_health(data.cache.as_ref()).await);

    Ok(HttpResponse::Ok().json(health))
}

/// Liveness probe - is the service alive?
pub async fn liveness_probe() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(LivenessProbe::healthy()))
}

/// Readiness probe - the database must answer; a degraded cache is tolerated
pub async fn readiness_probe(data: web::Data<AppState>) -> Result<HttpResponse> {
    let dependencies = [
        data.store.health().await,
        check_cache_health(data.cache.as_ref()).await,
    ];
    let probe = ReadinessProbe::from_dependencies(&dependencies);

    let status = if probe.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok(HttpResponse::build(status).json(probe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::Harness;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_liveness_probe() {
        let response = liveness_probe().await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[actix_web::test]
    async fn test_health_reports_store_and_cache() {
        let h = Harness::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::for_tests(&h)))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "thesis-service");
        let names: Vec<&str> = body["dependencies"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["database", "cache"]);
    }

    #[actix_web::test]
    async fn test_readiness_probe() {
        let h = Harness::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::for_tests(&h)))
                .route("/readiness", web::get().to(readiness_probe)),
        )
        .await;

        let req = test::TestRequest::get().uri("/readiness").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
