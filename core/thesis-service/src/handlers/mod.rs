// core/thesis-service/src/handlers/mod.rs
// HTTP surface: thin handlers over the services

pub mod auth;
pub mod departments;
pub mod documents;
pub mod grades;
pub mod health;
pub mod metrics;
pub mod notices;
pub mod selections;
pub mod topics;
pub mod users;

use actix_web::{web, HttpRequest};
use thesis_common::{generate_request_id, Claims, LogContext, ServiceError};

use crate::services::Actor;
use crate::storage::MAX_DOCUMENT_BYTES;

/// Room for a base64 encoded document plus its JSON envelope
pub const MAX_JSON_BYTES: usize = (MAX_DOCUMENT_BYTES / 3 + 1) * 4 + 64 * 1024;

pub(crate) fn actor(claims: &Claims) -> Result<Actor, ServiceError> {
    Ok(Actor::try_from(claims)?)
}

pub(crate) fn request_context(req: &HttpRequest) -> LogContext {
    let ctx = LogContext::new(generate_request_id());
    match req.connection_info().realip_remote_addr() {
        Some(ip) => ctx.with_ip(ip.to_string()),
        None => ctx,
    }
}

/// Every route the service exposes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_JSON_BYTES))
        // Health and metrics (no auth)
        .route("/health", web::get().to(health::health_check))
        .route("/liveness", web::get().to(health::liveness_probe))
        .route("/readiness", web::get().to(health::readiness_probe))
        .route("/metrics", web::get().to(metrics::metrics_handler))
        // Auth
        .route("/api/auth/captcha", web::get().to(auth::captcha))
        .route("/api/auth/login", web::post().to(auth::login))
        .route("/api/auth/logout", web::post().to(auth::logout))
        .route("/api/auth/refresh", web::post().to(auth::refresh))
        .route("/api/auth/me", web::get().to(auth::me))
        // Departments
        .route("/api/departments", web::get().to(departments::list))
        .route("/api/departments", web::post().to(departments::create))
        .route("/api/departments/{id}", web::get().to(departments::get))
        .route("/api/departments/{id}", web::put().to(departments::update))
        .route("/api/departments/{id}", web::delete().to(departments::delete))
        // Users
        .route("/api/users", web::get().to(users::page))
        .route("/api/users", web::post().to(users::create))
        .route("/api/users/{id}", web::get().to(users::get))
        .route("/api/users/{id}", web::put().to(users::update))
        .route("/api/users/{id}/password", web::put().to(users::change_password))
        .route("/api/users/{id}/enabled", web::put().to(users::set_enabled))
        // Topics
        .route("/api/topics", web::get().to(topics::page))
        .route("/api/topics", web::post().to(topics::create))
        .route("/api/topics/{id}", web::get().to(topics::get))
        .route("/api/topics/{id}", web::put().to(topics::update))
        .route("/api/topics/{id}", web::delete().to(topics::delete))
        .route("/api/topics/{id}/open", web::post().to(topics::open))
        .route("/api/topics/{id}/close", web::post().to(topics::close))
        .route("/api/topics/{id}/selections", web::get().to(selections::list_for_topic))
        // Selections ("mine" before "{id}")
        .route("/api/selections", web::post().to(selections::apply))
        .route("/api/selections/mine", web::get().to(selections::mine))
        .route("/api/selections/{id}", web::get().to(selections::get))
        .route("/api/selections/{id}/approve", web::post().to(selections::approve))
        .route("/api/selections/{id}/reject", web::post().to(selections::reject))
        .route("/api/selections/{id}/cancel", web::post().to(selections::cancel))
        // Documents
        .route("/api/documents", web::post().to(documents::submit))
        .route("/api/documents/mine", web::get().to(documents::mine))
        .route("/api/documents/{id}", web::get().to(documents::get))
        .route("/api/documents/{id}/content", web::get().to(documents::content))
        .route("/api/documents/{id}/review", web::post().to(documents::review))
        // Grades
        .route("/api/grades", web::put().to(grades::record))
        .route("/api/grades/{id}", web::get().to(grades::get))
        .route("/api/students/{id}/grades", web::get().to(grades::list_for_student))
        // Notices
        .route("/api/notices", web::get().to(notices::page))
        .route("/api/notices", web::post().to(notices::create))
        .route("/api/notices/{id}", web::get().to(notices::get))
        .route("/api/notices/{id}", web::put().to(notices::update))
        .route("/api/notices/{id}", web::delete().to(notices::delete));
}


#[cfg(test)]
mod tests {
    use super::testing::{bearer, test_app};
    use crate::services::fixtures::Harness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use thesis_common::Role;

    #[actix_web::test]
    async fn test_protected_route_needs_token() {
        let h = Harness::new();
        let app = test_app!(&h);

        let req = test::TestRequest::get().uri("/api/departments").to_request();
        let err = test::try_call_service(&app, req)
            .await
            .expect_err("Expected service to return error");
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_missing_department_renders_error_body() {
        let h = Harness::new();
        h.user("admin01", Role::Admin, None).await;
        let app = test_app!(&h);
        let token = bearer(&h, "admin01").await;

        let req = test::TestRequest::get()
            .uri("/api/departments/404")
            .insert_header(("Authorization", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error_code"], "not_found");
        assert!(h.cache.contains("department:info:404").await);
    }

    #[actix_web::test]
    async fn test_selection_routes_resolve_mine_before_id() {
        let h = Harness::new();
        h.user("student01", Role::Student, None).await;
        let app = test_app!(&h);
        let token = bearer(&h, "student01").await;

        let req = test::TestRequest::get()
            .uri("/api/selections/mine")
            .insert_header(("Authorization", token))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([]));
    }
}
