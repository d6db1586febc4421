//! `/v1/courses`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::HandlerResult;
use crate::http::auth::AuthUser;
use crate::http::dto::{CourseListQuery, ListResponse};
use crate::http::error::AppError;
use crate::http::extract::{ApiJson, ApiQuery};
use crate::http::state::AppState;
use crate::models::{Course, CourseId, NewCourse};
use crate::services::courses::{self, CourseUpdate};

/// GET /v1/courses?active_only=true
pub async fn list_courses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CourseListQuery>,
) -> HandlerResult<ListResponse<Course>> {
    let courses = courses::list_courses(state.repo(), query.active_only).await?;
    Ok(Json(courses.into()))
}

/// POST /v1/courses
pub async fn create_course(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(course): ApiJson<NewCourse>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    caller.require_admin()?;
    let course = courses::create_course(state.repo(), course).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /v1/courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> HandlerResult<Course> {
    let course = courses::get_course(state.repo(), CourseId::new(course_id)).await?;
    Ok(Json(course))
}

/// PATCH /v1/courses/{id}
pub async fn update_course(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(course_id): Path<i64>,
    ApiJson(update): ApiJson<CourseUpdate>,
) -> HandlerResult<Course> {
    caller.require_admin()?;
    let course = courses::update_course(state.repo(), CourseId::new(course_id), update).await?;
    Ok(Json(course))
}
