use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Course, CourseId, NewCourse};

/// Repository trait for the course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Store a new course. Course names are unique (`Conflict` otherwise).
    async fn create_course(&self, course: NewCourse) -> RepositoryResult<Course>;

    async fn get_course(&self, course_id: CourseId) -> RepositoryResult<Course>;

    async fn find_course_by_name(&self, name: &str) -> RepositoryResult<Option<Course>>;

    /// List courses ordered by ID, optionally restricted to active ones.
    async fn list_courses(&self, active_only: bool) -> RepositoryResult<Vec<Course>>;

    async fn update_course(&self, course: &Course) -> RepositoryResult<Course>;
}
