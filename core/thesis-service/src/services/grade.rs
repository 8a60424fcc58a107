// core/thesis-service/src/services/grade.rs

use std::sync::Arc;
use thesis_common::validation::{validate_score, validate_text, MAX_TEXT_LENGTH};
use thesis_common::{CacheAside, Role, ServiceError, ThesisMetrics};

use super::topic::ensure_owner;
use super::{Actor, TopicService};
use crate::models::grade::compute_total;
use crate::models::{Grade, GradeLevel, GradeRecord, RecordGradeRequest};
use crate::repository::{GradeRepository, SelectionRepository};

pub const NAMESPACE: &str = "grade";

#[derive(Clone)]
pub struct GradeService {
    repo: Arc<dyn GradeRepository>,
    selections: Arc<dyn SelectionRepository>,
    topics: TopicService,
    cache: CacheAside<Grade>,
    metrics: Option<ThesisMetrics>,
}

impl GradeService {
    pub fn new(
        repo: Arc<dyn GradeRepository>,
        selections: Arc<dyn SelectionRepository>,
        topics: TopicService,
        cache: CacheAside<Grade>,
        metrics: Option<ThesisMetrics>,
    ) -> Self {
        Self {
            repo,
            selections,
            topics,
            cache,
            metrics,
        }
    }

    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Grade, ServiceError> {
        let repo = &self.repo;
        let grade = self
            .cache
            .get_by_id(Some(id), |id| async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("grade {} not found", id)))?;

        if actor.role == Role::Student {
            actor.require_self_or_admin(grade.student_id)?;
        }
        Ok(grade)
    }

    /// Students read their own grades; teachers and admins read anyone's
    pub async fn list_for_student(&self, actor: &Actor, student_id: i64) -> Result<Vec<Grade>, ServiceError> {
        if actor.role == Role::Student {
            actor.require_self_or_admin(student_id)?;
        }
        Ok(self.repo.list_by_student(student_id).await?)
    }

    /// Record or replace the grade for a student on a topic. Only the
    /// topic's teacher or an admin may grade, and only students approved
    /// for the topic can be graded.
    pub async fn record(&self, actor: &Actor, req: RecordGradeRequest) -> Result<Grade, ServiceError> {
        validate_score("advisor_score", req.advisor_score)?;
        validate_score("review_score", req.review_score)?;
        validate_score("defense_score", req.defense_score)?;
        if let Some(comment) = &req.comment {
            validate_text("comment", comment, MAX_TEXT_LENGTH)?;
        }

        let topic = self.topics.get(req.topic_id).await?;
        ensure_owner(actor, &topic)?;

        if self
            .selections
            .find_approved(req.student_id, req.topic_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::Conflict(format!(
                "student {} is not approved for topic {}",
                req.student_id, req.topic_id
            )));
        }

        let total_score = compute_total(req.advisor_score, req.review_score, req.defense_score);
        let level = GradeLevel::from_total(total_score);
        let grade = self
            .repo
            .upsert(&GradeRecord {
                student_id: req.student_id,
                topic_id: req.topic_id,
                teacher_id: actor.id,
                advisor_score: req.advisor_score,
                review_score: req.review_score,
                defense_score: req.defense_score,
                total_score,
                level,
                comment: req.comment,
            })
            .await?;
        self.cache.invalidate(&grade.id).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .grades_recorded_total
                .with_label_values(&[level.as_str()])
                .inc();
        }
        tracing::info!(
            grade_id = grade.id,
            student_id = grade.student_id,
            total_score = total_score,
            level = %level,
            "Grade recorded"
        );
        Ok(grade)
    }
}
