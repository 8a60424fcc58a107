// core/thesis-service/src/repository/postgres.rs
// PostgreSQL store. Queries are checked at runtime so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use thesis_common::{check_database_health, DependencyHealth};

use super::{
    ApprovalOutcome, DepartmentRepository, DocumentRepository, GradeRepository, NoticeRepository,
    SelectionRepository, StoreError, StoreProbe, StoreResult, TopicRepository, UserRepository,
};
use crate::models::{
    Audience, Department, DepartmentInput, Document, DocumentKind, Grade, GradeRecord, NewDocument,
    NewUser, Notice, NoticeInput, Paging, ProfileChanges, ReviewStatus, Selection,
    SelectionStatus, Topic, TopicInput, TopicQuery, TopicStatus, User, UserQuery,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_column<T>(column: &str, value: &str) -> StoreResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", column, e)))
}

// ============================================================================
// ROWS
// ============================================================================

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    salt: String,
    role: String,
    real_name: String,
    email: Option<String>,
    phone: Option<String>,
    department_id: Option<i64>,
    number: Option<String>,
    title: Option<String>,
    major: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_user(row: UserRow) -> StoreResult<User> {
    Ok(User {
        id: row.id,
        username: row.username,
        password_hash: row.password_hash,
        salt: row.salt,
        role: parse_column("users.role", &row.role)?,
        real_name: row.real_name,
        email: row.email,
        phone: row.phone,
        department_id: row.department_id,
        number: row.number,
        title: row.title,
        major: row.major,
        enabled: row.enabled,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(sqlx::FromRow)]
struct TopicRow {
    id: i64,
    title: String,
    description: Option<String>,
    teacher_id: i64,
    department_id: i64,
    max_students: i32,
    selected_count: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_topic(row: TopicRow) -> StoreResult<Topic> {
    Ok(Topic {
        id: row.id,
        title: row.title,
        description: row.description,
        teacher_id: row.teacher_id,
        department_id: row.department_id,
        max_students: row.max_students,
        selected_count: row.selected_count,
        status: parse_column("topics.status", &row.status)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(sqlx::FromRow)]
struct SelectionRow {
    id: i64,
    topic_id: i64,
    student_id: i64,
    status: String,
    reason: Option<String>,
    reply: Option<String>,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

fn row_to_selection(row: SelectionRow) -> StoreResult<Selection> {
    Ok(Selection {
        id: row.id,
        topic_id: row.topic_id,
        student_id: row.student_id,
        status: parse_column("selections.status", &row.status)?,
        reason: row.reason,
        reply: row.reply,
        created_at: row.created_at,
        reviewed_at: row.reviewed_at,
    })
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: i64,
    student_id: i64,
    topic_id: i64,
    kind: String,
    file_name: String,
    storage_key: String,
    size_bytes: i64,
    sha256: String,
    status: String,
    review_comment: Option<String>,
    reviewer_id: Option<i64>,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

fn row_to_document(row: DocumentRow) -> StoreResult<Document> {
    Ok(Document {
        id: row.id,
        student_id: row.student_id,
        topic_id: row.topic_id,
        kind: parse_column("documents.kind", &row.kind)?,
        file_name: row.file_name,
        storage_key: row.storage_key,
        size_bytes: row.size_bytes,
        sha256: row.sha256,
        status: parse_column("documents.status", &row.status)?,
        review_comment: row.review_comment,
        reviewer_id: row.reviewer_id,
        submitted_at: row.submitted_at,
        reviewed_at: row.reviewed_at,
    })
}

#[derive(sqlx::FromRow)]
struct GradeRow {
    id: i64,
    student_id: i64,
    topic_id: i64,
    teacher_id: i64,
    advisor_score: f64,
    review_score: f64,
    defense_score: f64,
    total_score: f64,
    level: String,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_grade(row: GradeRow) -> StoreResult<Grade> {
    Ok(Grade {
        id: row.id,
        student_id: row.student_id,
        topic_id: row.topic_id,
        teacher_id: row.teacher_id,
        advisor_score: row.advisor_score,
        review_score: row.review_score,
        defense_score: row.defense_score,
        total_score: row.total_score,
        level: parse_column("grades.level", &row.level)?,
        comment: row.comment,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[derive(sqlx::FromRow)]
struct NoticeRow {
    id: i64,
    title: String,
    content: String,
    publisher_id: i64,
    audience: String,
    pinned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_notice(row: NoticeRow) -> StoreResult<Notice> {
    Ok(Notice {
        id: row.id,
        title: row.title,
        content: row.content,
        publisher_id: row.publisher_id,
        audience: parse_column("notices.audience", &row.audience)?,
        pinned: row.pinned,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn collect<R, T>(rows: Vec<R>, convert: fn(R) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(convert).collect()
}

/// `%keyword%` for ILIKE, `None` when the keyword is blank
fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("%{}%", k.replace('%', "\\%").replace('_', "\\_")))
}

// ============================================================================
// DEPARTMENTS
// ============================================================================

#[async_trait]
impl DepartmentRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Department>> {
        let row: Option<DepartmentRow> = sqlx::query_as("SELECT * FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Department::from))
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        let row: Option<DepartmentRow> =
            sqlx::query_as("SELECT * FROM departments WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Department::from))
    }

    async fn list_all(&self) -> StoreResult<Vec<Department>> {
        let rows: Vec<DepartmentRow> = sqlx::query_as("SELECT * FROM departments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    async fn insert(&self, input: &DepartmentInput) -> StoreResult<Department> {
        let row: DepartmentRow = sqlx::query_as(
            r#"
            INSERT INTO departments (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, input: &DepartmentInput) -> StoreResult<Option<Department>> {
        let row: Option<DepartmentRow> = sqlx::query_as(
            r#"
            UPDATE departments
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Department::from))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_references(&self, id: i64) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM users WHERE department_id = $1)
                 + (SELECT COUNT(*) FROM topics WHERE department_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// ============================================================================
// USERS
// ============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn insert(&self, user: &NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (
                username, password_hash, salt, role, real_name,
                email, phone, department_id, number, title, major
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.role.as_str())
        .bind(&user.real_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.department_id)
        .bind(&user.number)
        .bind(&user.title)
        .bind(&user.major)
        .fetch_one(&self.pool)
        .await?;
        row_to_user(row)
    }

    async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users SET
                real_name = COALESCE($2, real_name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                department_id = COALESCE($5, department_id),
                title = COALESCE($6, title),
                major = COALESCE($7, major),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.real_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.department_id)
        .bind(&changes.title)
        .bind(&changes.major)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_user).transpose()
    }

    async fn update_password(&self, id: i64, password_hash: &str, salt: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, salt = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(salt)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET enabled = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(enabled)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn page(&self, query: &UserQuery, paging: Paging) -> StoreResult<(Vec<User>, i64)> {
        const FILTER: &str = r#"
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::bigint IS NULL OR department_id = $2)
              AND ($3::text IS NULL OR username ILIKE $3 OR real_name ILIKE $3)
        "#;
        let role = query.role.map(|r| r.as_str());
        let pattern = like_pattern(query.keyword.as_deref());

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users {}", FILTER))
            .bind(role)
            .bind(query.department_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT * FROM users {} ORDER BY id LIMIT $4 OFFSET $5",
            FILTER
        ))
        .bind(role)
        .bind(query.department_id)
        .bind(&pattern)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((collect(rows, row_to_user)?, total))
    }
}

// ============================================================================
// TOPICS
// ============================================================================

#[async_trait]
impl TopicRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Topic>> {
        let row: Option<TopicRow> = sqlx::query_as("SELECT * FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_topic).transpose()
    }

    async fn page(&self, query: &TopicQuery, paging: Paging) -> StoreResult<(Vec<Topic>, i64)> {
        const FILTER: &str = r#"
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::bigint IS NULL OR teacher_id = $2)
              AND ($3::bigint IS NULL OR department_id = $3)
              AND ($4::text IS NULL OR title ILIKE $4)
        "#;
        let status = query.status.map(|s| s.as_str());
        let pattern = like_pattern(query.keyword.as_deref());

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM topics {}", FILTER))
            .bind(status)
            .bind(query.teacher_id)
            .bind(query.department_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<TopicRow> = sqlx::query_as(&format!(
            "SELECT * FROM topics {} ORDER BY id DESC LIMIT $5 OFFSET $6",
            FILTER
        ))
        .bind(status)
        .bind(query.teacher_id)
        .bind(query.department_id)
        .bind(&pattern)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((collect(rows, row_to_topic)?, total))
    }

    async fn insert(&self, teacher_id: i64, input: &TopicInput) -> StoreResult<Topic> {
        let row: TopicRow = sqlx::query_as(
            r#"
            INSERT INTO topics (title, description, teacher_id, department_id, max_students, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(teacher_id)
        .bind(input.department_id)
        .bind(input.max_students)
        .bind(TopicStatus::Draft.as_str())
        .fetch_one(&self.pool)
        .await?;
        row_to_topic(row)
    }

    async fn update(&self, id: i64, input: &TopicInput) -> StoreResult<Option<Topic>> {
        let row: Option<TopicRow> = sqlx::query_as(
            r#"
            UPDATE topics
            SET title = $2, description = $3, department_id = $4, max_students = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.department_id)
        .bind(input.max_students)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_topic).transpose()
    }

    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Option<Topic>> {
        let row: Option<TopicRow> = sqlx::query_as(
            "UPDATE topics SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_topic).transpose()
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// SELECTIONS
// ============================================================================

#[async_trait]
impl SelectionRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Selection>> {
        let row: Option<SelectionRow> = sqlx::query_as("SELECT * FROM selections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_selection).transpose()
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Selection>> {
        let rows: Vec<SelectionRow> =
            sqlx::query_as("SELECT * FROM selections WHERE student_id = $1 ORDER BY id")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        collect(rows, row_to_selection)
    }

    async fn list_by_topic(&self, topic_id: i64) -> StoreResult<Vec<Selection>> {
        let rows: Vec<SelectionRow> =
            sqlx::query_as("SELECT * FROM selections WHERE topic_id = $1 ORDER BY id")
                .bind(topic_id)
                .fetch_all(&self.pool)
                .await?;
        collect(rows, row_to_selection)
    }

    async fn find_active_by_student(&self, student_id: i64) -> StoreResult<Option<Selection>> {
        let row: Option<SelectionRow> = sqlx::query_as(
            "SELECT * FROM selections WHERE student_id = $1 AND status IN ('pending', 'approved')",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_selection).transpose()
    }

    async fn find_approved(&self, student_id: i64, topic_id: i64) -> StoreResult<Option<Selection>> {
        let row: Option<SelectionRow> = sqlx::query_as(
            r#"
            SELECT * FROM selections
            WHERE student_id = $1 AND topic_id = $2 AND status = 'approved'
            "#,
        )
        .bind(student_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_selection).transpose()
    }

    async fn count_active_for_topic(&self, topic_id: i64) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM selections WHERE topic_id = $1 AND status IN ('pending', 'approved')",
        )
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert(&self, topic_id: i64, student_id: i64, reason: Option<&str>) -> StoreResult<Selection> {
        let row: SelectionRow = sqlx::query_as(
            r#"
            INSERT INTO selections (topic_id, student_id, status, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(topic_id)
        .bind(student_id)
        .bind(SelectionStatus::Pending.as_str())
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;
        row_to_selection(row)
    }

    async fn resolve(
        &self,
        id: i64,
        status: SelectionStatus,
        reply: Option<&str>,
    ) -> StoreResult<Option<Selection>> {
        let row: Option<SelectionRow> = sqlx::query_as(
            r#"
            UPDATE selections
            SET status = $2, reply = COALESCE($3, reply), reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(reply)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_selection).transpose()
    }

    async fn approve(&self, id: i64, reply: Option<&str>) -> StoreResult<ApprovalOutcome> {
        let mut tx = self.pool.begin().await?;

        let selection: Option<SelectionRow> = sqlx::query_as(
            r#"
            UPDATE selections
            SET status = 'approved', reply = $2, reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reply)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(selection) = selection else {
            tx.rollback().await?;
            return Ok(ApprovalOutcome::NotPending);
        };

        // Row lock on the topic serialises concurrent approvals
        let topic: Option<TopicRow> = sqlx::query_as(
            r#"
            UPDATE topics
            SET selected_count = selected_count + 1,
                status = CASE WHEN selected_count + 1 >= max_students THEN 'closed' ELSE status END,
                updated_at = NOW()
            WHERE id = $1 AND selected_count < max_students
            RETURNING *
            "#,
        )
        .bind(selection.topic_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(topic) = topic else {
            tx.rollback().await?;
            return Ok(ApprovalOutcome::TopicFull);
        };

        tx.commit().await?;

        Ok(ApprovalOutcome::Approved {
            selection: row_to_selection(selection)?,
            topic: row_to_topic(topic)?,
        })
    }
}

// ============================================================================
// DOCUMENTS
// ============================================================================

#[async_trait]
impl DocumentRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_document).transpose()
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Document>> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE student_id = $1 ORDER BY id")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        collect(rows, row_to_document)
    }

    async fn has_pending(&self, student_id: i64, kind: DocumentKind) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM documents
                WHERE student_id = $1 AND kind = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(student_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, document: &NewDocument) -> StoreResult<Document> {
        let row: DocumentRow = sqlx::query_as(
            r#"
            INSERT INTO documents (
                student_id, topic_id, kind, file_name, storage_key, size_bytes, sha256, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(document.student_id)
        .bind(document.topic_id)
        .bind(document.kind.as_str())
        .bind(&document.file_name)
        .bind(&document.storage_key)
        .bind(document.size_bytes)
        .bind(&document.sha256)
        .bind(ReviewStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;
        row_to_document(row)
    }

    async fn review(
        &self,
        id: i64,
        status: ReviewStatus,
        comment: Option<&str>,
        reviewer_id: i64,
    ) -> StoreResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            UPDATE documents
            SET status = $2, review_comment = $3, reviewer_id = $4, reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(comment)
        .bind(reviewer_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_document).transpose()
    }
}

// ============================================================================
// GRADES
// ============================================================================

#[async_trait]
impl GradeRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Grade>> {
        let row: Option<GradeRow> = sqlx::query_as("SELECT * FROM grades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_grade).transpose()
    }

    async fn list_by_student(&self, student_id: i64) -> StoreResult<Vec<Grade>> {
        let rows: Vec<GradeRow> =
            sqlx::query_as("SELECT * FROM grades WHERE student_id = $1 ORDER BY id")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        collect(rows, row_to_grade)
    }

    async fn upsert(&self, record: &GradeRecord) -> StoreResult<Grade> {
        let row: GradeRow = sqlx::query_as(
            r#"
            INSERT INTO grades (
                student_id, topic_id, teacher_id, advisor_score, review_score,
                defense_score, total_score, level, comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (student_id, topic_id) DO UPDATE SET
                teacher_id = EXCLUDED.teacher_id,
                advisor_score = EXCLUDED.advisor_score,
                review_score = EXCLUDED.review_score,
                defense_score = EXCLUDED.defense_score,
                total_score = EXCLUDED.total_score,
                level = EXCLUDED.level,
                comment = EXCLUDED.comment,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(record.student_id)
        .bind(record.topic_id)
        .bind(record.teacher_id)
        .bind(record.advisor_score)
        .bind(record.review_score)
        .bind(record.defense_score)
        .bind(record.total_score)
        .bind(record.level.as_str())
        .bind(&record.comment)
        .fetch_one(&self.pool)
        .await?;
        row_to_grade(row)
    }
}

// ============================================================================
// NOTICES
// ============================================================================

#[async_trait]
impl NoticeRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Notice>> {
        let row: Option<NoticeRow> = sqlx::query_as("SELECT * FROM notices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_notice).transpose()
    }

    async fn page(&self, audiences: &[Audience], paging: Paging) -> StoreResult<(Vec<Notice>, i64)> {
        let audiences: Vec<String> = audiences.iter().map(|a| a.as_str().to_string()).collect();

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notices WHERE audience = ANY($1)")
                .bind(&audiences)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<NoticeRow> = sqlx::query_as(
            r#"
            SELECT * FROM notices
            WHERE audience = ANY($1)
            ORDER BY pinned DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&audiences)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((collect(rows, row_to_notice)?, total))
    }

    async fn insert(&self, publisher_id: i64, input: &NoticeInput) -> StoreResult<Notice> {
        let row: NoticeRow = sqlx::query_as(
            r#"
            INSERT INTO notices (title, content, publisher_id, audience, pinned)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(publisher_id)
        .bind(input.audience.as_str())
        .bind(input.pinned)
        .fetch_one(&self.pool)
        .await?;
        row_to_notice(row)
    }

    async fn update(&self, id: i64, input: &NoticeInput) -> StoreResult<Option<Notice>> {
        let row: Option<NoticeRow> = sqlx::query_as(
            r#"
            UPDATE notices
            SET title = $2, content = $3, audience = $4, pinned = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.audience.as_str())
        .bind(input.pinned)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_notice).transpose()
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StoreProbe for PgStore {
    async fn health(&self) -> DependencyHealth {
        check_database_health(&self.pool).await
    }
}
