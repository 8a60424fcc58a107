// core/thesis-service/src/handlers/notices.rs

use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::{NoticeInput, PageQuery};
use crate::state::AppState;

pub async fn page(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let page = data.services.notices.page(&actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let notice = data.services.notices.get(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notice))
}

pub async fn create(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<NoticeInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let notice = data.services.notices.create(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(notice))
}

pub async fn update(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<NoticeInput>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let notice = data
        .services
        .notices
        .update(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(notice))
}

pub async fn delete(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    data.services.notices.delete(&actor, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{bearer, test_app};
    use crate::services::fixtures::Harness;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use thesis_common::Role;

    #[actix_web::test]
    async fn test_students_page_hides_teacher_notices() {
        let h = Harness::new();
        h.user("li.na", Role::Teacher, None).await;
        h.user("zhang.wei", Role::Student, None).await;
        let app = test_app!(&h);
        let teacher = bearer(&h, "li.na").await;
        let student = bearer(&h, "zhang.wei").await;

        for (title, audience) in [("Defense schedule", "all"), ("Grading meeting", "teacher")] {
            let req = test::TestRequest::post()
                .uri("/api/notices")
                .insert_header(("Authorization", teacher.clone()))
                .set_json(serde_json::json!({
                    "title": title,
                    "content": "See the department office",
                    "audience": audience,
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get()
            .uri("/api/notices?page=1&page_size=20")
            .insert_header(("Authorization", student))
            .to_request();
        let page: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["records"][0]["title"], "Defense schedule");
    }
}
