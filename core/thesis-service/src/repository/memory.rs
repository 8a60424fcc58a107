// core/thesis-service/src/repository/memory.rs
// In-process store for tests and local development without PostgreSQL

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use thesis_common::{DependencyHealth, HealthStatus};

use super::{
    ApprovalOutcome, DepartmentRepository, DocumentRepository, GradeRepository, NoticeRepository,
    SelectionRepository, StoreError, StoreProbe, StoreResult, TopicRepository, UserRepository,
};
use crate::models::{
    Audience, Department, DepartmentInput, Document, DocumentKind, Grade, GradeRecord, NewDocument,
    NewUser, Notice, NoticeInput, Paging, ProfileChanges, ReviewStatus, Selection,
    SelectionStatus, Topic, TopicInput, TopicQuery, TopicStatus, User, UserQuery,
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    departments: BTreeMap<i64, Department>,
    users: BTreeMap<i64, User>,
    topics: BTreeMap<i64, Topic>,
    selections: BTreeMap<i64, Selection>,
    documents: BTreeMap<i64, Document>,
    grades: BTreeMap<i64, Grade>,
    notices: BTreeMap<i64, Notice>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Mirrors the constraints of the PostgreSQL schema: unique names,
/// one active selection per student, one grade per (student, topic).
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of single-entity lookups served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

fn page_of<T: Clone>(items: Vec<T>, paging: Paging) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    (paging.apply(&items), total)
}

fn matches_keyword(text: &str, keyword: Option<&str>) -> bool {
    match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => text.to_lowercase().contains(&k.to_lowercase()),
        None => true,
    }
}

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Department>> {
        self.count_read();
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        let tables = self.tables.read().await;
        Ok(tables.departments.values().find(|d| d.name == name).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<Department>> {
        Ok(self.tables.read().await.departments.values().cloned().collect())
    }

    async fn insert(&self, input: &DepartmentInput) -> StoreResult<Department> {
        let mut tables = self.tables.write().await;
        if tables.departments.values().any(|d| d.name == input.name) {
            return Err(StoreError::Conflict(format!("department {} exists", input.name)));
        }
        let now = Utc::now();
        let department = Department {
            id: tables.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.departments.insert(department.id, department.clone());
        Ok(department)
    }

    async fn update(&self, id: i64, input: &DepartmentInput) -> StoreResult<Option<Department>> {
        let mut tables = self.tables.write().await;
        if tables
            .departments
            .values()
            .any(|d| d.id != id && d.name == input.name)
        {
            return Err(StoreError::Conflict(format!("department {} exists", input.name)));
        }
        Ok(tables.departments.get_mut(&id).map(|d| {
            d.name = input.name.clone();
            d.description = input.description.clone();
            d.updated_at = Utc::now();
            d.clone()
        }))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.departments.remove(&id).is_some())
    }

    async fn count_references(&self, id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let users = tables
            .users
            .values()
            .filter(|u| u.department_id == Some(id))
            .count();
        let topics = tables
            .topics
            .values()
            .filter(|t| t.department_id == id)
            .count();
        Ok((users + topics) as i64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.count_read();
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, new: &NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(format!("username {} taken", new.username)));
        }
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: new.username.clone(),
            password_hash: new.password_hash.clone(),
            salt: new.salt.clone(),
            role: new.role,
            real_name: new.real_name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            department_id: new.department_id,
            number: new.number.clone(),
            title: new.title.clone(),
            major: new.major.clone(),
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|u| {
            if let Some(real_name) = &changes.real_name {
                u.real_name = real_name.clone();
            }
            if changes.email.is_some() {
                u.email = changes.email.clone();
            }
            if changes.phone.is_some() {
                u.phone = changes.phone.clone();
            }
            if changes.department_id.is_some() {
                u.department_id = changes.department_id;
            }
            if changes.title.is_some() {
                u.title = changes.title.clone();
            }
            if changes.major.is_some() {
                u.major = changes.major.clone();
            }
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&id) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                u.salt = salt.to_string();
                u.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&id) {
            Some(u) => {
                u.enabled = enabled;
                u.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn page(&self, query: &UserQuery, paging: Paging) -> StoreResult<(Vec<User>, i64)> {
        let tables = self.tables.read().await;
        let matching: Vec<User> = tables
            .users
            .values()
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .filter(|u| query.department_id.map_or(true, |d| u.department_id == Some(d)))
            .filter(|u| {
                matches_keyword(&u.username, query.keyword.as_deref())
                    || matches_keyword(&u.real_name, query.keyword.as_deref())
            })
            .cloned()
            .collect();
        Ok(page_of(matching, paging))
    }
}

#[async_trait]
impl TopicRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Topic>> {
        self.count_read();
        Ok(self.tables.read().await.topics.get(&id).cloned())
    }

    async fn page(&self, query: &TopicQuery, paging: Paging) -> StoreResult<(Vec<Topic>, i64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Topic> = tables
            .topics
            .values()
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.teacher_id.map_or(true, |id| t.teacher_id == id))
            .filter(|t| query.department_id.map_or(true, |id| t.department_id == id))
            .filter(|t| matches_keyword(&t.title, query.keyword.as_deref()))
            .cloned()
            .collect();
        matching.reverse();
        Ok(page_of(matching, paging))
    }

    async fn insert(&self, teacher_id: i64, input: &TopicInput) -> StoreResult<Topic> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let topic = Topic {
            id: tables.next_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            teacher_id,
            department_id: input.department_id,
            max_students: input.max_students,
            selected_count: 0,
            status: TopicStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        tables.topics.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn update(&self, id: i64, input: &TopicInput) -> StoreResult<Option<Topic>> {
        let mut tables = self.tables.write().await;
        Ok(tables.topics.get_mut(&id).map(|t| {
            t.title = input.title.clone();
            t.description = input.description.clone();
            t.department_id = input.department_id;
            t.max_students = input.max_students;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Option<Topic>> {
        let mut tables = self.tables.write().await;
        Ok(tables.topics.get_mut(&id).map(|t| {
            t.status = status;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.topics.remove(&id).is_some())
    }
}

#[async_trait]
impl SelectionRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Selection>> {
        self.count_read();
        Ok(self.tables.read().await.selections.get(&id).cloned())
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Selection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .selections
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_by_topic(&self, topic_id: i64) -> StoreResult<Vec<Selection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .selections
            .values()
            .filter(|s| s.topic_id == topic_id)
            .cloned()
            .collect())
    }

    async fn find_active_by_student(&self, student_id: i64) -> StoreResult<Option<Selection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .selections
            .values()
            .find(|s| s.student_id == student_id && s.status.is_active())
            .cloned())
    }

    async fn find_approved(&self, student_id: i64, topic_id: i64) -> StoreResult<Option<Selection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .selections
            .values()
            .find(|s| {
                s.student_id == student_id
                    && s.topic_id == topic_id
                    && s.status == SelectionStatus::Approved
            })
            .cloned())
    }

    async fn count_active_for_topic(&self, topic_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .selections
            .values()
            .filter(|s| s.topic_id == topic_id && s.status.is_active())
            .count() as i64)
    }

    async fn insert(&self, topic_id: i64, student_id: i64, reason: Option<&str>) -> StoreResult<Selection> {
        let mut tables = self.tables.write().await;
        if tables
            .selections
            .values()
            .any(|s| s.student_id == student_id && s.status.is_active())
        {
            return Err(StoreError::Conflict(
                "student already holds an active selection".to_string(),
            ));
        }
        let selection = Selection {
            id: tables.next_id(),
            topic_id,
            student_id,
            status: SelectionStatus::Pending,
            reason: reason.map(str::to_string),
            reply: None,
            created_at: Utc::now(),
            reviewed_at: None,
        };
        tables.selections.insert(selection.id, selection.clone());
        Ok(selection)
    }

    async fn resolve(
        &self,
        id: i64,
        status: SelectionStatus,
        reply: Option<&str>,
    ) -> StoreResult<Option<Selection>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .selections
            .get_mut(&id)
            .filter(|s| s.status == SelectionStatus::Pending)
            .map(|s| {
                s.status = status;
                if reply.is_some() {
                    s.reply = reply.map(str::to_string);
                }
                s.reviewed_at = Some(Utc::now());
                s.clone()
            }))
    }

    async fn approve(&self, id: i64, reply: Option<&str>) -> StoreResult<ApprovalOutcome> {
        // Single write lock: the checks and both updates happen atomically
        let mut tables = self.tables.write().await;

        let topic_id = match tables.selections.get(&id) {
            Some(s) if s.status == SelectionStatus::Pending => s.topic_id,
            _ => return Ok(ApprovalOutcome::NotPending),
        };

        let topic = match tables.topics.get_mut(&topic_id) {
            Some(t) if t.has_capacity() => {
                t.selected_count += 1;
                if !t.has_capacity() {
                    t.status = TopicStatus::Closed;
                }
                t.updated_at = Utc::now();
                t.clone()
            }
            _ => return Ok(ApprovalOutcome::TopicFull),
        };

        let selection = match tables.selections.get_mut(&id) {
            Some(s) => {
                s.status = SelectionStatus::Approved;
                s.reply = reply.map(str::to_string);
                s.reviewed_at = Some(Utc::now());
                s.clone()
            }
            None => return Ok(ApprovalOutcome::NotPending),
        };

        Ok(ApprovalOutcome::Approved { selection, topic })
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Document>> {
        self.count_read();
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Document>> {
        let tables = self.tables.read().await;
        Ok(tables
            .documents
            .values()
            .filter(|d| d.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn has_pending(&self, student_id: i64, kind: DocumentKind) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.documents.values().any(|d| {
            d.student_id == student_id && d.kind == kind && d.status == ReviewStatus::Pending
        }))
    }

    async fn insert(&self, new: &NewDocument) -> StoreResult<Document> {
        let mut tables = self.tables.write().await;
        let document = Document {
            id: tables.next_id(),
            student_id: new.student_id,
            topic_id: new.topic_id,
            kind: new.kind,
            file_name: new.file_name.clone(),
            storage_key: new.storage_key.clone(),
            size_bytes: new.size_bytes,
            sha256: new.sha256.clone(),
            status: ReviewStatus::Pending,
            review_comment: None,
            reviewer_id: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };
        tables.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn review(
        &self,
        id: i64,
        status: ReviewStatus,
        comment: Option<&str>,
        reviewer_id: i64,
    ) -> StoreResult<Option<Document>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .documents
            .get_mut(&id)
            .filter(|d| d.status == ReviewStatus::Pending)
            .map(|d| {
                d.status = status;
                d.review_comment = comment.map(str::to_string);
                d.reviewer_id = Some(reviewer_id);
                d.reviewed_at = Some(Utc::now());
                d.clone()
            }))
    }
}

#[async_trait]
impl GradeRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Grade>> {
        self.count_read();
        Ok(self.tables.read().await.grades.get(&id).cloned())
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Grade>> {
        let tables = self.tables.read().await;
        Ok(tables
            .grades
            .values()
            .filter(|g| g.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: &GradeRecord) -> StoreResult<Grade> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let existing = tables
            .grades
            .values()
            .find(|g| g.student_id == record.student_id && g.topic_id == record.topic_id)
            .map(|g| (g.id, g.created_at));
        let (id, created_at) = match existing {
            Some(found) => found,
            None => (tables.next_id(), now),
        };

        let grade = Grade {
            id,
            student_id: record.student_id,
            topic_id: record.topic_id,
            teacher_id: record.teacher_id,
            advisor_score: record.advisor_score,
            review_score: record.review_score,
            defense_score: record.defense_score,
            total_score: record.total_score,
            level: record.level,
            comment: record.comment.clone(),
            created_at,
            updated_at: now,
        };
        tables.grades.insert(id, grade.clone());
        Ok(grade)
    }
}

#[async_trait]
impl NoticeRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Notice>> {
        self.count_read();
        Ok(self.tables.read().await.notices.get(&id).cloned())
    }

    async fn page(&self, audiences: &[Audience], paging: Paging) -> StoreResult<(Vec<Notice>, i64)> {
        let tables = self.tables.read().await;
        let mut visible: Vec<Notice> = tables
            .notices
            .values()
            .filter(|n| audiences.contains(&n.audience))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.pinned.cmp(&a.pinned).then(b.id.cmp(&a.id)));
        Ok(page_of(visible, paging))
    }

    async fn insert(&self, publisher_id: i64, input: &NoticeInput) -> StoreResult<Notice> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let notice = Notice {
            id: tables.next_id(),
            title: input.title.clone(),
            content: input.content.clone(),
            publisher_id,
            audience: input.audience,
            pinned: input.pinned,
            created_at: now,
            updated_at: now,
        };
        tables.notices.insert(notice.id, notice.clone());
        Ok(notice)
    }

    async fn update(&self, id: i64, input: &NoticeInput) -> StoreResult<Option<Notice>> {
        let mut tables = self.tables.write().await;
        Ok(tables.notices.get_mut(&id).map(|n| {
            n.title = input.title.clone();
            n.content = input.content.clone();
            n.audience = input.audience;
            n.pinned = input.pinned;
            n.updated_at = Utc::now();
            n.clone()
        }))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.notices.remove(&id).is_some())
    }
}

#[async_trait]
impl StoreProbe for MemoryStore {
    async fn health(&self) -> DependencyHealth {
        DependencyHealth::new("database".to_string(), HealthStatus::Healthy)
            .with_message("in-memory store".to_string())
    }
}
