// core/thesis-service/src/services/notice.rs
// Notices, read straight from the store without caching

use std::sync::Arc;
use thesis_common::validation::{validate_title, MAX_TEXT_LENGTH, MAX_TITLE_LENGTH};
use thesis_common::{Role, ServiceError};

use super::Actor;
use crate::models::{Audience, Notice, NoticeInput, Page, PageQuery, Paging};
use crate::repository::NoticeRepository;

#[derive(Clone)]
pub struct NoticeService {
    repo: Arc<dyn NoticeRepository>,
}

impl NoticeService {
    pub fn new(repo: Arc<dyn NoticeRepository>) -> Self {
        Self { repo }
    }

    /// Notices addressed to another audience read as missing
    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Notice, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|notice| Audience::visible_to(actor.role).contains(&notice.audience))
            .ok_or_else(|| ServiceError::NotFound(format!("notice {} not found", id)))
    }

    pub async fn page(&self, actor: &Actor, query: PageQuery) -> Result<Page<Notice>, ServiceError> {
        let paging = Paging::from(query);
        let (notices, total) = self
            .repo
            .page(Audience::visible_to(actor.role), paging)
            .await?;
        Ok(Page::new(notices, total, paging))
    }

    pub async fn create(&self, actor: &Actor, input: NoticeInput) -> Result<Notice, ServiceError> {
        actor.require(&[Role::Teacher])?;
        let input = validate_input(input)?;

        let notice = self.repo.insert(actor.id, &input).await?;
        tracing::info!(
            notice_id = notice.id,
            publisher_id = actor.id,
            audience = %notice.audience,
            "Notice published"
        );
        Ok(notice)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: NoticeInput) -> Result<Notice, ServiceError> {
        self.ensure_publisher(actor, id).await?;
        let input = validate_input(input)?;

        self.repo
            .update(id, &input)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("notice {} not found", id)))
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<(), ServiceError> {
        self.ensure_publisher(actor, id).await?;

        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(format!("notice {} not found", id)));
        }
        tracing::info!(notice_id = id, "Notice deleted");
        Ok(())
    }

    async fn ensure_publisher(&self, actor: &Actor, id: i64) -> Result<(), ServiceError> {
        let notice = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("notice {} not found", id)))?;
        actor.require_self_or_admin(notice.publisher_id)
    }
}

fn validate_input(input: NoticeInput) -> Result<NoticeInput, ServiceError> {
    let title = input.title.trim().to_string();
    validate_title("title", &title, MAX_TITLE_LENGTH)?;
    validate_title("content", &input.content, MAX_TEXT_LENGTH)?;
    Ok(NoticeInput { title, ..input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{actor, Harness, ADMIN};

    fn input(title: &str, audience: Audience, pinned: bool) -> NoticeInput {
        NoticeInput {
            title: title.to_string(),
            content: "Proposal defences start next Monday.".to_string(),
            audience,
            pinned,
        }
    }

    #[tokio::test]
    async fn test_students_see_their_audience_only() {
        let h = Harness::new();
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);
        let student = actor(&h.user("student01", Role::Student, None).await);
        let svc = &h.services.notices;

        let for_all = svc.create(&ADMIN, input("Schedule", Audience::All, false)).await.unwrap();
        let for_teachers = svc
            .create(&teacher, input("Reviewer duty", Audience::Teacher, false))
            .await
            .unwrap();

        let page = svc.page(&student, PageQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].id, for_all.id);

        assert!(matches!(
            svc.get(&student, for_teachers.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(svc.get(&teacher, for_teachers.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_pinned_notices_come_first() {
        let h = Harness::new();
        let svc = &h.services.notices;

        let pinned = svc.create(&ADMIN, input("Read me", Audience::All, true)).await.unwrap();
        svc.create(&ADMIN, input("Later news", Audience::All, false)).await.unwrap();

        let page = svc.page(&ADMIN, PageQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.records[0].id, pinned.id);
    }

    #[tokio::test]
    async fn test_students_cannot_publish() {
        let h = Harness::new();
        let student = actor(&h.user("student01", Role::Student, None).await);

        let err = h
            .services
            .notices
            .create(&student, input("Hello", Audience::All, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));
    }

    #[tokio::test]
    async fn test_only_publisher_or_admin_edits() {
        let h = Harness::new();
        let owner = actor(&h.user("teacher01", Role::Teacher, None).await);
        let other = actor(&h.user("teacher02", Role::Teacher, None).await);
        let svc = &h.services.notices;
        let notice = svc.create(&owner, input("Lab hours", Audience::Student, false)).await.unwrap();

        let err = svc
            .update(&other, notice.id, input("Changed", Audience::Student, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        let updated = svc
            .update(&owner, notice.id, input("Lab hours moved", Audience::Student, true))
            .await
            .unwrap();
        assert_eq!(updated.title, "Lab hours moved");
        assert!(updated.pinned);

        svc.delete(&ADMIN, notice.id).await.unwrap();
        assert!(matches!(
            svc.get(&ADMIN, notice.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let h = Harness::new();
        let err = h
            .services
            .notices
            .create(&ADMIN, input("   ", Audience::All, false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
