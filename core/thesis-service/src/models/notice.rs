// core/thesis-service/src/models/notice.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thesis_common::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Student,
    Teacher,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Student => "student",
            Audience::Teacher => "teacher",
        }
    }

    /// Audiences a reader with `role` may see; admins see everything
    pub fn visible_to(role: Role) -> &'static [Audience] {
        match role {
            Role::Student => &[Audience::All, Audience::Student],
            Role::Teacher => &[Audience::All, Audience::Teacher],
            Role::Admin => &[Audience::All, Audience::Student, Audience::Teacher],
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Audience::All),
            "student" => Ok(Audience::Student),
            "teacher" => Ok(Audience::Teacher),
            other => Err(format!("unknown audience: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub publisher_id: i64,
    pub audience: Audience,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create and update body
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeInput {
    pub title: String,
    pub content: String,
    #[serde(default = "default_audience")]
    pub audience: Audience,
    #[serde(default)]
    pub pinned: bool,
}

fn default_audience() -> Audience {
    Audience::All
}
