// core/thesis-service/src/services/selection.rs

use std::sync::Arc;
use thesis_common::validation::{validate_text, MAX_TEXT_LENGTH};
use thesis_common::{CacheAside, Role, ServiceError, ThesisMetrics};

use super::topic::ensure_owner;
use super::{Actor, TopicService};
use crate::models::{ApplyRequest, Selection, SelectionStatus, TopicStatus};
use crate::repository::{ApprovalOutcome, SelectionRepository};

pub const NAMESPACE: &str = "selection";

#[derive(Clone)]
pub struct SelectionService {
    repo: Arc<dyn SelectionRepository>,
    topics: TopicService,
    cache: CacheAside<Selection>,
    metrics: Option<ThesisMetrics>,
}

impl SelectionService {
    pub fn new(
        repo: Arc<dyn SelectionRepository>,
        topics: TopicService,
        cache: CacheAside<Selection>,
        metrics: Option<ThesisMetrics>,
    ) -> Self {
        Self {
            repo,
            topics,
            cache,
            metrics,
        }
    }

    async fn load(&self, id: i64) -> Result<Selection, ServiceError> {
        let repo = &self.repo;
        self.cache
            .get_by_id(Some(id), |id| async move { repo.find_by_id(id).await })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("selection {} not found", id)))
    }

    /// Visible to the applying student, the topic's teacher and admins
    pub async fn get(&self, actor: &Actor, id: i64) -> Result<Selection, ServiceError> {
        let selection = self.load(id).await?;
        if actor.is_admin() || selection.student_id == actor.id {
            return Ok(selection);
        }
        let topic = self.topics.get(selection.topic_id).await?;
        ensure_owner(actor, &topic)?;
        Ok(selection)
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<Vec<Selection>, ServiceError> {
        actor.require(&[Role::Student])?;
        Ok(self.repo.list_by_student(actor.id).await?)
    }

    pub async fn list_for_topic(&self, actor: &Actor, topic_id: i64) -> Result<Vec<Selection>, ServiceError> {
        let topic = self.topics.get(topic_id).await?;
        ensure_owner(actor, &topic)?;
        Ok(self.repo.list_by_topic(topic_id).await?)
    }

    /// A student applies for an open topic with free places. Each student
    /// holds at most one pending or approved selection.
    pub async fn apply(&self, actor: &Actor, req: ApplyRequest) -> Result<Selection, ServiceError> {
        if actor.role != Role::Student {
            return Err(ServiceError::Forbidden);
        }
        if let Some(reason) = &req.reason {
            validate_text("reason", reason, MAX_TEXT_LENGTH)?;
        }

        let topic = self.topics.get(req.topic_id).await?;
        if topic.status != TopicStatus::Open {
            return Err(ServiceError::Conflict(format!(
                "topic {} is not open for selection",
                topic.id
            )));
        }
        if !topic.has_capacity() {
            return Err(ServiceError::Conflict(format!("topic {} is full", topic.id)));
        }
        if let Some(active) = self.repo.find_active_by_student(actor.id).await? {
            return Err(ServiceError::Conflict(format!(
                "you already hold selection {} ({})",
                active.id, active.status
            )));
        }

        let selection = self
            .repo
            .insert(topic.id, actor.id, req.reason.as_deref())
            .await?;
        self.invalidate(&selection).await;
        self.record(SelectionStatus::Pending);

        tracing::info!(
            selection_id = selection.id,
            topic_id = topic.id,
            student_id = actor.id,
            "Selection submitted"
        );
        Ok(selection)
    }

    /// Approval takes one place on the topic and closes it when the last
    /// place is gone; both happen in one store transaction.
    pub async fn approve(&self, actor: &Actor, id: i64, reply: Option<String>) -> Result<Selection, ServiceError> {
        let selection = self.load(id).await?;
        let topic = self.topics.get(selection.topic_id).await?;
        ensure_owner(actor, &topic)?;
        validate_reply(reply.as_deref())?;

        match self.repo.approve(id, reply.as_deref()).await? {
            ApprovalOutcome::Approved { selection, topic } => {
                self.invalidate(&selection).await;
                self.record(SelectionStatus::Approved);
                if topic.status == TopicStatus::Closed {
                    self.topics.record_closed();
                    tracing::info!(topic_id = topic.id, "Topic full; closed");
                }
                Ok(selection)
            }
            ApprovalOutcome::NotPending => {
                self.cache.invalidate(&id).await;
                Err(ServiceError::Conflict(format!("selection {} is not pending", id)))
            }
            ApprovalOutcome::TopicFull => {
                self.topics.invalidate(topic.id).await;
                Err(ServiceError::Conflict(format!("topic {} is full", topic.id)))
            }
        }
    }

    pub async fn reject(&self, actor: &Actor, id: i64, reply: Option<String>) -> Result<Selection, ServiceError> {
        let selection = self.load(id).await?;
        let topic = self.topics.get(selection.topic_id).await?;
        ensure_owner(actor, &topic)?;
        validate_reply(reply.as_deref())?;

        self.resolve(id, SelectionStatus::Rejected, reply.as_deref()).await
    }

    /// Students withdraw their own application while it is still pending
    pub async fn cancel(&self, actor: &Actor, id: i64) -> Result<Selection, ServiceError> {
        let selection = self.load(id).await?;
        if selection.student_id != actor.id {
            return Err(ServiceError::Forbidden);
        }

        self.resolve(id, SelectionStatus::Cancelled, None).await
    }

    async fn resolve(
        &self,
        id: i64,
        status: SelectionStatus,
        reply: Option<&str>,
    ) -> Result<Selection, ServiceError> {
        match self.repo.resolve(id, status, reply).await? {
            Some(selection) => {
                self.invalidate(&selection).await;
                self.record(status);
                tracing::info!(selection_id = id, status = %status, "Selection resolved");
                Ok(selection)
            }
            None => {
                self.cache.invalidate(&id).await;
                Err(ServiceError::Conflict(format!("selection {} is not pending", id)))
            }
        }
    }

    async fn invalidate(&self, selection: &Selection) {
        self.cache.invalidate(&selection.id).await;
        self.topics.invalidate(selection.topic_id).await;
    }

    fn record(&self, status: SelectionStatus) {
        if let Some(metrics) = &self.metrics {
            metrics.selections_total.with_label_values(&[status.as_str()]).inc();
        }
    }
}

fn validate_reply(reply: Option<&str>) -> Result<(), ServiceError> {
    if let Some(reply) = reply {
        validate_text("reply", reply, MAX_TEXT_LENGTH)?;
    }
    Ok(())
}
