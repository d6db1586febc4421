use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CourseId;

/// A course offering in the school's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub description: String,
    /// Fee in minor currency units.
    pub fee: i64,
    pub duration_weeks: i32,
    pub total_lessons: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fee: i64,
    pub duration_weeks: i32,
    pub total_lessons: i32,
}
