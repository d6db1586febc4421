//! Course catalog management.

use serde::Deserialize;
use tracing::info;

use super::{require_non_empty, ServiceError, ServiceResult};
use crate::db::repository::{CourseRepository, FullRepository};
use crate::models::{Course, CourseId, NewCourse};

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub fee: Option<i64>,
    pub duration_weeks: Option<i32>,
    pub total_lessons: Option<i32>,
    pub active: Option<bool>,
}

fn validate_numbers(fee: i64, duration_weeks: i32, total_lessons: i32) -> ServiceResult<()> {
    if fee <= 0 {
        return Err(ServiceError::bad_request("fee must be greater than zero"));
    }
    if duration_weeks <= 0 {
        return Err(ServiceError::bad_request(
            "duration_weeks must be greater than zero",
        ));
    }
    if total_lessons <= 0 {
        return Err(ServiceError::bad_request(
            "total_lessons must be greater than zero",
        ));
    }
    Ok(())
}

pub async fn create_course<R: FullRepository + ?Sized>(
    repo: &R,
    mut course: NewCourse,
) -> ServiceResult<Course> {
    require_non_empty("name", &course.name)?;
    validate_numbers(course.fee, course.duration_weeks, course.total_lessons)?;
    course.name = course.name.trim().to_string();

    if repo.find_course_by_name(&course.name).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "Course '{}' already exists",
            course.name
        )));
    }

    let created = repo.create_course(course).await?;
    info!(course_id = %created.id, name = %created.name, "Course created");
    Ok(created)
}

pub async fn list_courses<R: FullRepository + ?Sized>(
    repo: &R,
    active_only: bool,
) -> ServiceResult<Vec<Course>> {
    Ok(repo.list_courses(active_only).await?)
}

pub async fn get_course<R: FullRepository + ?Sized>(
    repo: &R,
    course_id: CourseId,
) -> ServiceResult<Course> {
    Ok(repo.get_course(course_id).await?)
}

pub async fn update_course<R: FullRepository + ?Sized>(
    repo: &R,
    course_id: CourseId,
    update: CourseUpdate,
) -> ServiceResult<Course> {
    let mut course = repo.get_course(course_id).await?;

    if let Some(name) = update.name {
        require_non_empty("name", &name)?;
        let name = name.trim().to_string();
        if !name.eq_ignore_ascii_case(&course.name) {
            if let Some(other) = repo.find_course_by_name(&name).await? {
                if other.id != course.id {
                    return Err(ServiceError::Conflict(format!(
                        "Course '{}' already exists",
                        name
                    )));
                }
            }
        }
        course.name = name;
    }
    if let Some(description) = update.description {
        course.description = description;
    }
    if let Some(fee) = update.fee {
        course.fee = fee;
    }
    if let Some(weeks) = update.duration_weeks {
        course.duration_weeks = weeks;
    }
    if let Some(lessons) = update.total_lessons {
        course.total_lessons = lessons;
    }
    if let Some(active) = update.active {
        course.active = active;
    }
    validate_numbers(course.fee, course.duration_weeks, course.total_lessons)?;

    let updated = repo.update_course(&course).await?;
    info!(course_id = %updated.id, active = updated.active, "Course updated");
    Ok(updated)
}
