// core/thesis-service/src/handlers/auth.rs
// Captcha, login, logout, refresh and the current user

use actix_web::{web, HttpRequest, HttpResponse};
use thesis_common::logging::sanitize_for_logging;
use thesis_common::{extract_bearer_token, log_auth_attempt, AuthError, Claims, ServiceError};

use super::{actor, request_context};
use crate::models::LoginRequest;
use crate::state::AppState;

pub async fn captcha(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let challenge = data.services.auth.issue_captcha().await?;
    Ok(HttpResponse::Ok().json(challenge))
}

pub async fn login(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    let ctx = request_context(&req);
    let username = sanitize_for_logging(body.username.trim());

    let result = data.services.auth.login(body.into_inner()).await;
    match &result {
        Ok(login) => log_auth_attempt(&ctx.with_user(login.user.id, login.user.role), &username, true),
        Err(_) => log_auth_attempt(&ctx, &username, false),
    }

    Ok(HttpResponse::Ok().json(result?))
}

pub async fn logout(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, ServiceError> {
    data.services.auth.logout(&claims).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Reachable without the auth middleware; the token travels in the header
pub async fn refresh(data: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;
    let token = extract_bearer_token(header)?;

    let refreshed = data.services.auth.refresh(&token).await?;
    Ok(HttpResponse::Ok().json(refreshed))
}

pub async fn me(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let profile = data.services.users.get_profile(actor.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}
