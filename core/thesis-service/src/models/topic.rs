// core/thesis-service/src/models/topic.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Draft,
    Open,
    Closed,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Draft => "draft",
            TopicStatus::Open => "open",
            TopicStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TopicStatus::Draft),
            "open" => Ok(TopicStatus::Open),
            "closed" => Ok(TopicStatus::Closed),
            other => Err(format!("unknown topic status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub teacher_id: i64,
    pub department_id: i64,
    pub max_students: i32,
    pub selected_count: i32,
    pub status: TopicStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    pub fn has_capacity(&self) -> bool {
        self.selected_count < self.max_students
    }
}

/// Create and update body
#[derive(Debug, Clone, Deserialize)]
pub struct TopicInput {
    pub title: String,
    pub description: Option<String>,
    pub department_id: i64,
    pub max_students: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicQuery {
    pub status: Option<TopicStatus>,
    pub teacher_id: Option<i64>,
    pub department_id: Option<i64>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
