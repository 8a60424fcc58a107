// core/thesis-service/src/handlers/grades.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::RecordGradeRequest;
use crate::state::AppState;

/// Insert or replace the grade for a student's topic
pub async fn record(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<RecordGradeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let grade = data.services.grades.record(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(grade))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let grade = data.services.grades.get(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(grade))
}

pub async fn list_for_student(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let grades = data
        .services
        .grades
        .list_for_student(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(grades))
}
