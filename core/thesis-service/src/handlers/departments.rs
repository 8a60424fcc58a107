// core/thesis-service/src/handlers/departments.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::DepartmentInput;
use crate::state::AppState;

pub async fn list(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let departments = data.services.departments.list_all().await?;
    Ok(HttpResponse::Ok().json(departments))
}

pub async fn get(data: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let department = data.services.departments.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn create(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<DepartmentInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let department = data.services.departments.create(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(department))
}

pub async fn update(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<DepartmentInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let department = data
        .services
        .departments
        .update(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(department))
}

pub async fn delete(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    data.services.departments.delete(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
