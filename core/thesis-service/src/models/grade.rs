// core/thesis-service/src/models/grade.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weights in percent
pub const ADVISOR_WEIGHT: i64 = 40;
pub const REVIEW_WEIGHT: i64 = 30;
pub const DEFENSE_WEIGHT: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeLevel {
    Excellent,
    Good,
    Medium,
    Pass,
    Fail,
}

impl GradeLevel {
    pub fn from_total(total: f64) -> Self {
        if total >= 90.0 {
            GradeLevel::Excellent
        } else if total >= 80.0 {
            GradeLevel::Good
        } else if total >= 70.0 {
            GradeLevel::Medium
        } else if total >= 60.0 {
            GradeLevel::Pass
        } else {
            GradeLevel::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLevel::Excellent => "excellent",
            GradeLevel::Good => "good",
            GradeLevel::Medium => "medium",
            GradeLevel::Pass => "pass",
            GradeLevel::Fail => "fail",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(GradeLevel::Excellent),
            "good" => Ok(GradeLevel::Good),
            "medium" => Ok(GradeLevel::Medium),
            "pass" => Ok(GradeLevel::Pass),
            "fail" => Ok(GradeLevel::Fail),
            other => Err(format!("unknown grade level: {}", other)),
        }
    }
}

fn hundredths(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

/// Weighted 40/30/30, rounded half-up to one decimal. Summed in integer
/// units so exact ties such as 89.95 are not lost to binary fractions.
pub fn compute_total(advisor: f64, review: f64, defense: f64) -> f64 {
    // hundredths of a point times percent: units of 1/10000
    let weighted = hundredths(advisor) * ADVISOR_WEIGHT
        + hundredths(review) * REVIEW_WEIGHT
        + hundredths(defense) * DEFENSE_WEIGHT;
    let tenths = (weighted + 500) / 1000;
    tenths as f64 / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub topic_id: i64,
    pub teacher_id: i64,
    pub advisor_score: f64,
    pub review_score: f64,
    pub defense_score: f64,
    pub total_score: f64,
    pub level: GradeLevel,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload keyed by (student_id, topic_id)
#[derive(Debug, Clone)]
pub struct GradeRecord {
    pub student_id: i64,
    pub topic_id: i64,
    pub teacher_id: i64,
    pub advisor_score: f64,
    pub review_score: f64,
    pub defense_score: f64,
    pub total_score: f64,
    pub level: GradeLevel,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordGradeRequest {
    pub student_id: i64,
    pub topic_id: i64,
    pub advisor_score: f64,
    pub review_score: f64,
    pub defense_score: f64,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_total_rounds_to_one_decimal() {
        assert_eq!(compute_total(90.0, 80.0, 70.0), 81.0);
        assert_eq!(compute_total(88.0, 91.0, 79.0), 86.2);
        // 85*0.4 + 77*0.3 + 93*0.3 = 34 + 23.1 + 27.9 = 85.0
        assert_eq!(compute_total(85.0, 77.0, 93.0), 85.0);
        assert_eq!(compute_total(100.0, 100.0, 100.0), 100.0);
        assert_eq!(compute_total(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_compute_total_rounds_exact_ties_up() {
        // 34 + 27.6 + 28.35 = 89.95
        assert_eq!(compute_total(85.0, 92.0, 94.5), 90.0);
        assert_eq!(GradeLevel::from_total(compute_total(85.0, 92.0, 94.5)), GradeLevel::Excellent);
        // 30.2 + 23.55 + 24.0 = 77.75
        assert_eq!(compute_total(75.5, 78.5, 80.0), 77.8);
        assert_eq!(compute_total(59.5, 60.0, 60.5), 60.0);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(GradeLevel::from_total(90.0), GradeLevel::Excellent);
        assert_eq!(GradeLevel::from_total(89.9), GradeLevel::Good);
        assert_eq!(GradeLevel::from_total(80.0), GradeLevel::Good);
        assert_eq!(GradeLevel::from_total(70.0), GradeLevel::Medium);
        assert_eq!(GradeLevel::from_total(60.0), GradeLevel::Pass);
        assert_eq!(GradeLevel::from_total(59.9), GradeLevel::Fail);
    }

    #[test]
    fn test_level_round_trips_through_text() {
        for level in [GradeLevel::Excellent, GradeLevel::Pass, GradeLevel::Fail] {
            assert_eq!(level.as_str().parse::<GradeLevel>().unwrap(), level);
        }
    }
}
