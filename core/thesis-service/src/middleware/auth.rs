// core/thesis-service/src/middleware/auth.rs
// Bearer token authentication with single-session enforcement

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use thesis_common::{extract_bearer_token, AuthError, CacheStore, JwtManager, ServiceError};

use crate::services::auth::check_session;

const PUBLIC_PREFIXES: [&str; 4] = ["/health", "/liveness", "/readiness", "/metrics"];
const PUBLIC_PATHS: [&str; 3] = ["/api/auth/captcha", "/api/auth/login", "/api/auth/refresh"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub struct AuthMiddleware {
    jwt_manager: Rc<JwtManager>,
    sessions: Arc<dyn CacheStore>,
}

impl AuthMiddleware {
    pub fn new(jwt_manager: JwtManager, sessions: Arc<dyn CacheStore>) -> Self {
        Self {
            jwt_manager: Rc::new(jwt_manager),
            sessions,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_manager: self.jwt_manager.clone(),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_manager: Rc<JwtManager>,
    sessions: Arc<dyn CacheStore>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
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
        let jwt_manager = self.jwt_manager.clone();
        let sessions = self.sessions.clone();
        let service = self.service.clone();

        Box::pin(async move {
            if is_public(req.path()) {
                return service.call(req).await;
            }

            let header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .ok_or(AuthError::MissingAuth)
                .map_err(ServiceError::from)?;

            let token = extract_bearer_token(header).map_err(ServiceError::from)?;
            let claims = jwt_manager.verify_token(&token).map_err(ServiceError::from)?;
            check_session(sessions.as_ref(), &claims)
                .await
                .map_err(|e| {
                    tracing::debug!(user = %claims.sub, "Rejected token with a stale session");
                    ServiceError::from(e)
                })?;

            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
