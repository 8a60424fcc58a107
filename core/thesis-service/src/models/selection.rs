// core/thesis-service/src/models/selection.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl SelectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStatus::Pending => "pending",
            SelectionStatus::Approved => "approved",
            SelectionStatus::Rejected => "rejected",
            SelectionStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and approved selections hold the student's one slot
    pub fn is_active(&self) -> bool {
        matches!(self, SelectionStatus::Pending | SelectionStatus::Approved)
    }
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SelectionStatus::Pending),
            "approved" => Ok(SelectionStatus::Approved),
            "rejected" => Ok(SelectionStatus::Rejected),
            "cancelled" => Ok(SelectionStatus::Cancelled),
            other => Err(format!("unknown selection status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: i64,
    pub topic_id: i64,
    pub student_id: i64,
    pub status: SelectionStatus,
    pub reason: Option<String>,
    pub reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyRequest {
    pub topic_id: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSelectionRequest {
    pub reply: Option<String>,
}
