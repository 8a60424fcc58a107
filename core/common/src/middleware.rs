// core/common/src/middleware.rs
// Rate limiting for the unauthenticated auth endpoints

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::logging::{generate_request_id, log_rate_limit_exceeded, LogContext};
use crate::rate_limit::{RateLimit, RateLimitError, RateLimiter};

pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let limiter = self.limiter.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let endpoint = req.path().to_string();
            if !limiter.is_limited(&endpoint) {
                return service.call(req).await;
            }

            let key = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            match limiter.check_rate_limit(&endpoint, &key).await {
                Ok(info) => {
                    let mut res = service.call(req).await?;

                    let headers = res.headers_mut();
                    for (header_name, header_value) in info.to_headers() {
                        if let (Ok(name), Ok(value)) = (
                            HeaderName::from_bytes(header_name.as_bytes()),
                            HeaderValue::from_str(&header_value),
                        ) {
                            headers.insert(name, value);
                        }
                    }

                    Ok(res)
                }
                Err(err @ RateLimitError::LimitExceeded { .. }) => {
                    let ctx = LogContext::new(generate_request_id()).with_ip(key.clone());
                    log_rate_limit_exceeded(&ctx, &endpoint, &key);
                    Err(ServiceError::from(err).into())
                }
                Err(RateLimitError::InternalError(msg)) => {
                    // Fail open
                    tracing::warn!(endpoint = %endpoint, error = %msg, "Rate limiter error");
                    service.call(req).await
                }
            }
        })
    }
}

/// Limits on the endpoints reachable without a token
pub fn configure_rate_limits(limiter: &mut RateLimiter, login_per_minute: u32) {
    limiter.add_limit("/api/auth/login".to_string(), RateLimit::per_minute(login_per_minute));
    limiter.add_limit(
        "/api/auth/captcha".to_string(),
        RateLimit::per_minute(login_per_minute.saturating_mul(2)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, HttpResponse};

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn limiter(per_minute: u32) -> Arc<RateLimiter> {
        let mut limiter = RateLimiter::new();
        configure_rate_limits(&mut limiter, per_minute);
        Arc::new(limiter)
    }

    #[actix_web::test]
    async fn test_login_limited_after_quota() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(2)))
                .route("/api/auth/login", web::post().to(ok_handler)),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/api/auth/login").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            assert!(resp.headers().contains_key("x-ratelimit-remaining"));
        }

        let req = test::TestRequest::post().uri("/api/auth/login").to_request();
        let err = test::try_call_service(&app, req)
            .await
            .expect_err("third login should be limited");
        assert_eq!(err.error_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_unlimited_paths_pass_through() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter(1)))
                .route("/api/topics", web::get().to(ok_handler)),
        )
        .await;

        for _ in 0..5 {
            let req = test::TestRequest::get().uri("/api/topics").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
            assert!(!resp.headers().contains_key("x-ratelimit-limit"));
        }
    }
}
