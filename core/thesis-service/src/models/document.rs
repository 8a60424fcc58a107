// core/thesis-service/src/models/document.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Proposal,
    Midterm,
    Thesis,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Proposal => "proposal",
            DocumentKind::Midterm => "midterm",
            DocumentKind::Thesis => "thesis",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposal" => Ok(DocumentKind::Proposal),
            "midterm" => Ok(DocumentKind::Midterm),
            "thesis" => Ok(DocumentKind::Thesis),
            other => Err(format!("unknown document kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(format!("unknown review status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub student_id: i64,
    pub topic_id: i64,
    pub kind: DocumentKind,
    pub file_name: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub status: ReviewStatus,
    pub review_comment: Option<String>,
    pub reviewer_id: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub student_id: i64,
    pub topic_id: i64,
    pub kind: DocumentKind,
    pub file_name: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub sha256: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitDocumentRequest {
    pub kind: DocumentKind,
    pub file_name: String,
    /// File content, standard base64
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDocumentRequest {
    pub approved: bool,
    pub comment: Option<String>,
}
