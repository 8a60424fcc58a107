// core/thesis-service/src/models/mod.rs
// Entities, request/response DTOs and paging

pub mod auth;
pub mod department;
pub mod document;
pub mod grade;
pub mod notice;
pub mod paging;
pub mod selection;
pub mod topic;
pub mod user;

pub use auth::{CaptchaChallenge, LoginRequest, LoginResponse, TokenResponse};
pub use department::{Department, DepartmentInput};
pub use document::{Document, DocumentKind, NewDocument, ReviewDocumentRequest, ReviewStatus, SubmitDocumentRequest};
pub use grade::{Grade, GradeLevel, GradeRecord, RecordGradeRequest};
pub use notice::{Audience, Notice, NoticeInput};
pub use paging::{Page, PageQuery, Paging};
pub use selection::{ApplyRequest, ReviewSelectionRequest, Selection, SelectionStatus};
pub use topic::{Topic, TopicInput, TopicQuery, TopicStatus};
pub use user::{
    ChangePasswordRequest, CreateUserRequest, NewUser, ProfileChanges, SetEnabledRequest, User,
    UserProfile, UserQuery,
};
