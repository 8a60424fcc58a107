// core/thesis-service/src/handlers/selections.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::{ApplyRequest, ReviewSelectionRequest};
use crate::state::AppState;

fn reply_of(body: Option<web::Json<ReviewSelectionRequest>>) -> Option<String> {
    body.and_then(|b| b.into_inner().reply)
}

pub async fn list_for_topic(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selections = data
        .services
        .selections
        .list_for_topic(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(selections))
}

pub async fn apply(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<ApplyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selection = data.services.selections.apply(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(selection))
}

pub async fn mine(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selections = data.services.selections.list_mine(&actor).await?;
    Ok(HttpResponse::Ok().json(selections))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selection = data.services.selections.get(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(selection))
}

pub async fn approve(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: Option<web::Json<ReviewSelectionRequest>>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selection = data
        .services
        .selections
        .approve(&actor, path.into_inner(), reply_of(body))
        .await?;
    Ok(HttpResponse::Ok().json(selection))
}

pub async fn reject(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: Option<web::Json<ReviewSelectionRequest>>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selection = data
        .services
        .selections
        .reject(&actor, path.into_inner(), reply_of(body))
        .await?;
    Ok(HttpResponse::Ok().json(selection))
}

pub async fn cancel(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let selection = data.services.selections.cancel(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(selection))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{bearer, test_app};
    use crate::services::fixtures::{actor, Harness};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use thesis_common::Role;

    #[actix_web::test]
    async fn test_apply_and_approve_over_http() {
        let h = Harness::new();
        let dept = h.department("Computer Science").await;
        let teacher = h.user("li.na", Role::Teacher, Some(dept.id)).await;
        h.user("zhang.wei", Role::Student, Some(dept.id)).await;
        let topic = h.open_topic(&actor(&teacher), dept.id, 1).await;
        let app = test_app!(&h);
        let teacher_token = bearer(&h, "li.na").await;
        let student_token = bearer(&h, "zhang.wei").await;

        let req = test::TestRequest::post()
            .uri("/api/selections")
            .insert_header(("Authorization", student_token.clone()))
            .set_json(serde_json::json!({ "topic_id": topic.id, "reason": "Caching is my thing" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let selection: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(selection["status"], "pending");

        // No body at all is accepted
        let req = test::TestRequest::post()
            .uri(&format!("/api/selections/{}/approve", selection["id"]))
            .insert_header(("Authorization", teacher_token))
            .to_request();
        let approved: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(approved["status"], "approved");

        let req = test::TestRequest::get()
            .uri(&format!("/api/topics/{}", topic.id))
            .insert_header(("Authorization", student_token.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/selections/mine")
            .insert_header(("Authorization", student_token))
            .to_request();
        let mine: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mine[0]["status"], "approved");
    }

    #[actix_web::test]
    async fn test_teacher_cannot_apply() {
        let h = Harness::new();
        let dept = h.department("Computer Science").await;
        let teacher = h.user("li.na", Role::Teacher, Some(dept.id)).await;
        let topic = h.open_topic(&actor(&teacher), dept.id, 2).await;
        let app = test_app!(&h);
        let token = bearer(&h, "li.na").await;

        let req = test::TestRequest::post()
            .uri("/api/selections")
            .insert_header(("Authorization", token))
            .set_json(serde_json::json!({ "topic_id": topic.id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
