// core/thesis-service/src/handlers/users.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::{ChangePasswordRequest, CreateUserRequest, ProfileChanges, SetEnabledRequest, UserQuery};
use crate::state::AppState;

pub async fn page(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let page = data.services.users.page(&actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let user = data.services.users.create(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let user = data.services.users.view_profile(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<ProfileChanges>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let user = data
        .services
        .users
        .update_profile(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn change_password(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    data.services
        .users
        .change_password(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn set_enabled(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<SetEnabledRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let user = data
        .services
        .users
        .set_enabled(&actor, path.into_inner(), body.enabled)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}
