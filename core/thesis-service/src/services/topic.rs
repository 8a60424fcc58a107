// core/thesis-service/src/services/topic.rs

use std::sync::Arc;
use thesis_common::validation::{validate_text, validate_title, MAX_TEXT_LENGTH, MAX_TITLE_LENGTH};
use thesis_common::{CacheAside, Role, ServiceError, ThesisMetrics};

use super::{Actor, DepartmentService};
use crate::models::{Page, PageQuery, Paging, Topic, TopicInput, TopicQuery, TopicStatus};
use crate::repository::{SelectionRepository, TopicRepository};

pub const NAMESPACE: &str = "topic";
pub const MAX_STUDENTS_PER_TOPIC: i32 = 10;

#[derive(Clone)]
pub struct TopicService {
    repo: Arc<dyn TopicRepository>,
    selections: Arc<dyn SelectionRepository>,
    departments: DepartmentService,
    cache: CacheAside<Topic>,
    metrics: Option<ThesisMetrics>,
}

impl TopicService {
    pub fn new(
        repo: Arc<dyn TopicRepository>,
        selections: Arc<dyn SelectionRepository>,
        departments: DepartmentService,
        cache: CacheAside<Topic>,
        metrics: Option<ThesisMetrics>,
    ) -> Self {
        Self {
            repo,
            selections,
            departments,
            cache,
            metrics,
        }
    }

    pub async fn get(&self, id: i64) -> Result<Topic, ServiceError> {
        let repo = &self.repo;
        self.cache
            .get_by_id(Some(id), |id| async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("topic {} not found", id)))
    }

    /// A draft or closed topic reads as missing to students
    pub async fn view(&self, actor: &Actor, id: i64) -> Result<Topic, ServiceError> {
        let topic = self.get(id).await?;
        if actor.role == Role::Student && topic.status != TopicStatus::Open {
            return Err(ServiceError::NotFound(format!("topic {} not found", id)));
        }
        Ok(topic)
    }

    /// Students only ever see open topics
    pub async fn page(&self, actor: &Actor, mut query: TopicQuery) -> Result<Page<Topic>, ServiceError> {
        if actor.role == Role::Student {
            query.status = Some(TopicStatus::Open);
        }
        let paging = Paging::from(PageQuery {
            page: query.page,
            page_size: query.page_size,
        });

        let (topics, total) = self.repo.page(&query, paging).await?;
        Ok(Page::new(topics, total, paging))
    }

    /// New topics start as drafts owned by the caller
    pub async fn create(&self, actor: &Actor, input: TopicInput) -> Result<Topic, ServiceError> {
        actor.require(&[Role::Teacher])?;
        let input = self.validate_input(input).await?;

        let topic = self.repo.insert(actor.id, &input).await?;
        self.cache.invalidate(&topic.id).await;

        tracing::info!(topic_id = topic.id, teacher_id = actor.id, "Topic created");
        Ok(topic)
    }

    pub async fn update(&self, actor: &Actor, id: i64, input: TopicInput) -> Result<Topic, ServiceError> {
        let current = self.get(id).await?;
        ensure_owner(actor, &current)?;
        let input = self.validate_input(input).await?;

        if input.max_students < current.selected_count {
            return Err(ServiceError::Conflict(format!(
                "topic already has {} approved students",
                current.selected_count
            )));
        }

        let topic = self
            .repo
            .update(id, &input)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("topic {} not found", id)))?;
        self.cache.invalidate(&id).await;

        Ok(topic)
    }

    pub async fn open(&self, actor: &Actor, id: i64) -> Result<Topic, ServiceError> {
        let current = self.get(id).await?;
        ensure_owner(actor, &current)?;

        if current.status == TopicStatus::Open {
            return Err(ServiceError::Conflict(format!("topic {} is already open", id)));
        }
        if !current.has_capacity() {
            return Err(ServiceError::Conflict(format!("topic {} has no free places", id)));
        }

        let topic = self.set_status(id, TopicStatus::Open).await?;
        if let Some(metrics) = &self.metrics {
            metrics.open_topics.inc();
        }
        Ok(topic)
    }

    pub async fn close(&self, actor: &Actor, id: i64) -> Result<Topic, ServiceError> {
        let current = self.get(id).await?;
        ensure_owner(actor, &current)?;

        if current.status != TopicStatus::Open {
            return Err(ServiceError::Conflict(format!("topic {} is not open", id)));
        }

        let topic = self.set_status(id, TopicStatus::Closed).await?;
        self.record_closed();
        Ok(topic)
    }

    /// Only topics without pending or approved selections can be removed
    pub async fn delete(&self, actor: &Actor, id: i64) -> Result<(), ServiceError> {
        let current = self.get(id).await?;
        ensure_owner(actor, &current)?;

        let active = self.selections.count_active_for_topic(id).await?;
        if active > 0 {
            return Err(ServiceError::Conflict(format!(
                "topic {} has {} active selections",
                id, active
            )));
        }

        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(format!("topic {} not found", id)));
        }
        self.cache.invalidate(&id).await;
        if current.status == TopicStatus::Open {
            self.record_closed();
        }

        tracing::info!(topic_id = id, "Topic deleted");
        Ok(())
    }

    /// Drop the cached snapshot after a write made elsewhere
    pub async fn invalidate(&self, id: i64) {
        self.cache.invalidate(&id).await;
    }

    pub(crate) fn record_closed(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.open_topics.dec();
        }
    }

    async fn set_status(&self, id: i64, status: TopicStatus) -> Result<Topic, ServiceError> {
        let topic = self
            .repo
            .set_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("topic {} not found", id)))?;
        self.cache.invalidate(&id).await;

        tracing::info!(topic_id = id, status = %status, "Topic status changed");
        Ok(topic)
    }

    async fn validate_input(&self, input: TopicInput) -> Result<TopicInput, ServiceError> {
        let title = input.title.trim().to_string();
        validate_title("title", &title, MAX_TITLE_LENGTH)?;
        if let Some(description) = &input.description {
            validate_text("description", description, MAX_TEXT_LENGTH)?;
        }
        if !(1..=MAX_STUDENTS_PER_TOPIC).contains(&input.max_students) {
            return Err(ServiceError::ValidationError(format!(
                "max_students must be between 1 and {}",
                MAX_STUDENTS_PER_TOPIC
            )));
        }
        self.departments.ensure_exists(input.department_id).await?;

        Ok(TopicInput { title, ..input })
    }
}

/// The topic's teacher or an admin
pub fn ensure_owner(actor: &Actor, topic: &Topic) -> Result<(), ServiceError> {
    actor.require_self_or_admin(topic.teacher_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{actor, Harness, ADMIN};

    fn input(department_id: i64, max_students: i32) -> TopicInput {
        TopicInput {
            title: "Negative caching for sparse keys".to_string(),
            description: None,
            department_id,
            max_students,
        }
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, Some(dept.id)).await);

        let topic = h.services.topics.create(&teacher, input(dept.id, 2)).await.unwrap();
        assert_eq!(topic.status, TopicStatus::Draft);
        assert_eq!(topic.teacher_id, teacher.id);
        assert_eq!(topic.selected_count, 0);
    }

    #[tokio::test]
    async fn test_students_cannot_view_drafts() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, Some(dept.id)).await);
        let student = actor(&h.user("student01", Role::Student, Some(dept.id)).await);

        let draft = h.services.topics.create(&teacher, input(dept.id, 2)).await.unwrap();
        assert!(matches!(
            h.services.topics.view(&student, draft.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(h.services.topics.view(&teacher, draft.id).await.is_ok());

        h.services.topics.open(&teacher, draft.id).await.unwrap();
        assert!(h.services.topics.view(&student, draft.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_students_cannot_create_topics() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let student = actor(&h.user("student01", Role::Student, Some(dept.id)).await);

        let err = h.services.topics.create(&student, input(dept.id, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));
    }

    #[tokio::test]
    async fn test_invalid_capacity_rejected() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);

        for max in [0, MAX_STUDENTS_PER_TOPIC + 1] {
            let err = h.services.topics.create(&teacher, input(dept.id, max)).await.unwrap_err();
            assert!(matches!(err, ServiceError::ValidationError(_)));
        }
    }

    #[tokio::test]
    async fn test_open_and_close_refresh_cached_topic() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);
        let topic = h.services.topics.create(&teacher, input(dept.id, 2)).await.unwrap();

        assert_eq!(h.services.topics.get(topic.id).await.unwrap().status, TopicStatus::Draft);

        h.services.topics.open(&teacher, topic.id).await.unwrap();
        assert_eq!(h.services.topics.get(topic.id).await.unwrap().status, TopicStatus::Open);

        h.services.topics.close(&teacher, topic.id).await.unwrap();
        assert_eq!(h.services.topics.get(topic.id).await.unwrap().status, TopicStatus::Closed);

        let err = h.services.topics.close(&teacher, topic.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_may_edit() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let owner = actor(&h.user("teacher01", Role::Teacher, None).await);
        let other = actor(&h.user("teacher02", Role::Teacher, None).await);
        let topic = h.services.topics.create(&owner, input(dept.id, 2)).await.unwrap();

        let err = h.services.topics.open(&other, topic.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        let updated = h.services.topics.update(&ADMIN, topic.id, input(dept.id, 3)).await.unwrap();
        assert_eq!(updated.max_students, 3);
    }

    #[tokio::test]
    async fn test_students_page_open_topics_only() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);
        let student = actor(&h.user("student01", Role::Student, None).await);

        h.services.topics.create(&teacher, input(dept.id, 1)).await.unwrap();
        let open = h.open_topic(&teacher, dept.id, 2).await;

        let page = h.services.topics.page(&student, TopicQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].id, open.id);

        let page = h.services.topics.page(&teacher, TopicQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_delete_refused_with_active_selection() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);
        let student = actor(&h.user("student01", Role::Student, None).await);
        let topic = h.open_topic(&teacher, dept.id, 2).await;

        h.services
            .selections
            .apply(
                &student,
                crate::models::ApplyRequest {
                    topic_id: topic.id,
                    reason: None,
                },
            )
            .await
            .unwrap();

        let err = h.services.topics.delete(&teacher, topic.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_deleted_topic_reads_as_not_found() {
        let h = Harness::new();
        let dept = h.department("CS").await;
        let teacher = actor(&h.user("teacher01", Role::Teacher, None).await);
        let topic = h.services.topics.create(&teacher, input(dept.id, 1)).await.unwrap();
        h.services.topics.get(topic.id).await.unwrap();

        h.services.topics.delete(&teacher, topic.id).await.unwrap();
        assert!(matches!(
            h.services.topics.get(topic.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
