// core/thesis-service/src/handlers/documents.rs

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use thesis_common::{Claims, ServiceError};

use super::actor;
use crate::models::{ReviewDocumentRequest, SubmitDocumentRequest};
use crate::state::AppState;

pub async fn submit(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    body: web::Json<SubmitDocumentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let document = data.services.documents.submit(&actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(document))
}

pub async fn mine(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let documents = data.services.documents.list_mine(&actor).await?;
    Ok(HttpResponse::Ok().json(documents))
}

pub async fn get(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let document = data.services.documents.get(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(document))
}

/// Raw file download
pub async fn content(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let (document, bytes) = data
        .services
        .documents
        .download(&actor, path.into_inner())
        .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.replace('"', "_")
    );
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((header::CONTENT_DISPOSITION, disposition))
        .body(bytes))
}

pub async fn review(
    data: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<ReviewDocumentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let actor = actor(&claims)?;
    let document = data
        .services
        .documents
        .review(&actor, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(document))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{bearer, test_app};
    use crate::models::ApplyRequest;
    use crate::services::fixtures::{actor, Harness};
    use actix_web::http::{header, StatusCode};
    use actix_web::test;
    use base64::{engine::general_purpose, Engine as _};
    use thesis_common::Role;

    async fn approved_student(h: &Harness) {
        let dept = h.department("Computer Science").await;
        let teacher = actor(&h.user("li.na", Role::Teacher, Some(dept.id)).await);
        let student = actor(&h.user("zhang.wei", Role::Student, Some(dept.id)).await);
        let topic = h.open_topic(&teacher, dept.id, 2).await;
        let selection = h
            .services
            .selections
            .apply(
                &student,
                ApplyRequest {
                    topic_id: topic.id,
                    reason: None,
                },
            )
            .await
            .unwrap();
        h.services
            .selections
            .approve(&teacher, selection.id, None)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn test_upload_then_download() {
        let h = Harness::new();
        approved_student(&h).await;
        let app = test_app!(&h);
        let token = bearer(&h, "zhang.wei").await;

        let req = test::TestRequest::post()
            .uri("/api/documents")
            .insert_header(("Authorization", token.clone()))
            .set_json(serde_json::json!({
                "kind": "proposal",
                "file_name": "proposal.pdf",
                "content_base64": general_purpose::STANDARD.encode(b"%PDF-1.4 proposal"),
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let document: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(document["status"], "pending");

        let req = test::TestRequest::get()
            .uri(&format!("/api/documents/{}/content", document["id"]))
            .insert_header(("Authorization", token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"proposal.pdf\""
        );
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"%PDF-1.4 proposal");
    }

    #[actix_web::test]
    async fn test_rejection_without_comment_is_invalid() {
        let h = Harness::new();
        approved_student(&h).await;
        let app = test_app!(&h);
        let student = bearer(&h, "zhang.wei").await;
        let teacher = bearer(&h, "li.na").await;

        let req = test::TestRequest::post()
            .uri("/api/documents")
            .insert_header(("Authorization", student))
            .set_json(serde_json::json!({
                "kind": "thesis",
                "file_name": "thesis.docx",
                "content_base64": general_purpose::STANDARD.encode(b"draft"),
            }))
            .to_request();
        let document: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/documents/{}/review", document["id"]))
            .insert_header(("Authorization", teacher))
            .set_json(serde_json::json!({ "approved": false }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
