// core/thesis-service/src/repository/mod.rs
// Persistent store contracts, one trait per entity

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thesis_common::{DependencyHealth, ServiceError};
use thiserror::Error;

use crate::models::{
    Audience, Department, DepartmentInput, Document, DocumentKind, Grade, GradeRecord, NewDocument,
    NewUser, Notice, NoticeInput, Paging, ProfileChanges, ReviewStatus, Selection,
    SelectionStatus, Topic, TopicInput, TopicQuery, TopicStatus, User, UserQuery,
};

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    /// Unique or check constraint violated
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 unique_violation, 23503 foreign_key_violation
            if matches!(db_err.code().as_deref(), Some("23505") | Some("23503")) {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(err.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Database(msg) => ServiceError::DatabaseError(msg),
            StoreError::Corrupt(msg) => ServiceError::InternalError(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Department>>;
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>>;
    async fn list_all(&self) -> StoreResult<Vec<Department>>;
    async fn insert(&self, input: &DepartmentInput) -> StoreResult<Department>;
    async fn update(&self, id: i64, input: &DepartmentInput) -> StoreResult<Option<Department>>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    /// Users and topics that point at the department
    async fn count_references(&self, id: i64) -> StoreResult<i64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn insert(&self, user: &NewUser) -> StoreResult<User>;
    async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> StoreResult<Option<User>>;
    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> StoreResult<bool>;
    async fn set_enabled(&self, id: i64, enabled: bool) -> StoreResult<bool>;
    async fn page(&self, query: &UserQuery, paging: Paging) -> StoreResult<(Vec<User>, i64)>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Topic>>;
    async fn page(&self, query: &TopicQuery, paging: Paging) -> StoreResult<(Vec<Topic>, i64)>;
    async fn insert(&self, teacher_id: i64, input: &TopicInput) -> StoreResult<Topic>;
    async fn update(&self, id: i64, input: &TopicInput) -> StoreResult<Option<Topic>>;
    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Option<Topic>>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

/// Result of approving a selection inside one transaction
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved { selection: Selection, topic: Topic },
    NotPending,
    TopicFull,
}

#[async_trait]
pub trait SelectionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Selection>>;
    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Selection>>;
    async fn list_by_topic(&self, topic_id: i64) -> StoreResult<Vec<Selection>>;
    async fn find_active_by_student(&self, student_id: i64) -> StoreResult<Option<Selection>>;
    async fn find_approved(&self, student_id: i64, topic_id: i64) -> StoreResult<Option<Selection>>;
    async fn count_active_for_topic(&self, topic_id: i64) -> StoreResult<i64>;
    async fn insert(&self, topic_id: i64, student_id: i64, reason: Option<&str>) -> StoreResult<Selection>;
    /// Move a pending selection to `status`; `None` when it was not pending
    async fn resolve(
        &self,
        id: i64,
        status: SelectionStatus,
        reply: Option<&str>,
    ) -> StoreResult<Option<Selection>>;
    /// Approve a pending selection, take one seat on its topic and close the
    /// topic when the last seat is taken, all or nothing
    async fn approve(&self, id: i64, reply: Option<&str>) -> StoreResult<ApprovalOutcome>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Document>>;
    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Document>>;
    async fn has_pending(&self, student_id: i64, kind: DocumentKind) -> StoreResult<bool>;
    async fn insert(&self, document: &NewDocument) -> StoreResult<Document>;
    /// Record a review on a pending document; `None` when it was not pending
    async fn review(
        &self,
        id: i64,
        status: ReviewStatus,
        comment: Option<&str>,
        reviewer_id: i64,
    ) -> StoreResult<Option<Document>>;
}

#[async_trait]
pub trait GradeRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Grade>>;
    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Grade>>;
    /// Insert or replace the grade for (student, topic)
    async fn upsert(&self, record: &GradeRecord) -> StoreResult<Grade>;
}

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Notice>>;
    /// Pinned first, newest first
    async fn page(&self, audiences: &[Audience], paging: Paging) -> StoreResult<(Vec<Notice>, i64)>;
    async fn insert(&self, publisher_id: i64, input: &NoticeInput) -> StoreResult<Notice>;
    async fn update(&self, id: i64, input: &NoticeInput) -> StoreResult<Option<Notice>>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait StoreProbe: Send + Sync {
    async fn health(&self) -> DependencyHealth;
}

/// Every repository handle the services need
#[derive(Clone)]
pub struct Repositories {
    pub departments: Arc<dyn DepartmentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub selections: Arc<dyn SelectionRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub grades: Arc<dyn GradeRepository>,
    pub notices: Arc<dyn NoticeRepository>,
    pub probe: Arc<dyn StoreProbe>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        Self::from_store(Arc::new(store))
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: DepartmentRepository
            + UserRepository
            + TopicRepository
            + SelectionRepository
            + DocumentRepository
            + GradeRepository
            + NoticeRepository
            + StoreProbe
            + 'static,
    {
        Self {
            departments: store.clone(),
            users: store.clone(),
            topics: store.clone(),
            selections: store.clone(),
            documents: store.clone(),
            grades: store.clone(),
            notices: store.clone(),
            probe: store,
        }
    }
}
