// core/thesis-service/src/handlers/metrics.rs
// Prometheus scrape endpoint

use actix_web::{web, HttpResponse, Result};
use prometheus::{Encoder, TextEncoder};
use thesis_common::ServiceError;

use crate::state::AppState;

pub async fn metrics_handler(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&data.registry.gather(), &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::Harness;
    use crate::state::AppState;
    use actix_web::{test, App};
    use thesis_common::ThesisMetrics;

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_registry() {
        let h = Harness::new();
        let state = AppState::for_tests(&h);
        let metrics = ThesisMetrics::new(&state.registry).unwrap();
        metrics.logins_total.with_label_values(&["success"]).inc();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/metrics", web::get().to(metrics_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("logins_total{result=\"success\"} 1"));
    }
}
