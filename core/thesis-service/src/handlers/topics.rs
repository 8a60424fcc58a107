// core/thesis-service/src/handlers/topics.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::{TopicInput, TopicQuery};
use crate::state::AppState;

pub async fn page(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    query: web::Query<TopicQuery>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let page = data.services.topics.page(&actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let topic = data.services.topics.view(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

pub async fn create(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<TopicInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let topic = data.services.topics.create(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(topic))
}

pub async fn update(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<TopicInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let topic = data
        .services
        .topics
        .update(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(topic))
}

pub async fn delete(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    data.services.topics.delete(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn open(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let topic = data.services.topics.open(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

pub async fn close(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let topic = data.services.topics.close(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(topic))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{bearer, test_app};
    use crate::services::fixtures::Harness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use thesis_common::Role;

    #[actix_web::test]
    async fn test_teacher_drafts_and_opens_topic() {
        let h = Harness::new();
        let dept = h.department("Computer Science").await;
        h.user("li.na", Role::Teacher, Some(dept.id)).await;
        h.user("zhang.wei", Role::Student, Some(dept.id)).await;
        let app = test_app!(&h);
        let teacher = bearer(&h, "li.na").await;
        let student = bearer(&h, "zhang.wei").await;

        let req = test::TestRequest::post()
            .uri("/api/topics")
            .insert_header(("Authorization", teacher.clone()))
            .set_json(serde_json::json!({
                "title": "Bloom filters in front of a cache",
                "department_id": dept.id,
                "max_students": 2,
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let topic: serde_json::Value = test::read_body_json(resp).await;
        let id = topic["id"].as_i64().unwrap();

        let uri = format!("/api/topics/{}", id);
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(("Authorization", student.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri(&format!("/api/topics/{}/open", id))
            .insert_header(("Authorization", teacher))
            .to_request();
        let opened: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(opened["status"], "open");

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(("Authorization", student))
            .to_request();
        let seen: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(seen["title"], "Bloom filters in front of a cache");
    }
}
