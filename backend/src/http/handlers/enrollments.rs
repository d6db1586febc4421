//! `/v1/enrollments` and a student's enrollment list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::HandlerResult;
use crate::http::auth::AuthUser;
use crate::http::dto::{EnrollmentStatusRequest, ListResponse, ProgressRequest};
use crate::http::error::AppError;
use crate::http::extract::ApiJson;
use crate::http::state::AppState;
use crate::models::{Enrollment, EnrollmentId, UserId};
use crate::services::enrollments::{self, EnrollRequest};

/// POST /v1/enrollments
pub async fn enroll(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(request): ApiJson<EnrollRequest>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    caller.require_staff()?;
    let enrollment = enrollments::enroll(state.repo(), request).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// GET /v1/enrollments/{id}
pub async fn get_enrollment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(enrollment_id): Path<i64>,
) -> HandlerResult<Enrollment> {
    let enrollment =
        enrollments::get_enrollment(state.repo(), EnrollmentId::new(enrollment_id)).await?;
    caller.require_self_or_staff(enrollment.student_id)?;
    Ok(Json(enrollment))
}

/// PATCH /v1/enrollments/{id}/progress
pub async fn record_progress(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(enrollment_id): Path<i64>,
    ApiJson(request): ApiJson<ProgressRequest>,
) -> HandlerResult<Enrollment> {
    caller.require_staff()?;
    let enrollment = enrollments::record_progress(
        state.repo(),
        EnrollmentId::new(enrollment_id),
        request.lessons_completed,
    )
    .await?;
    Ok(Json(enrollment))
}

/// PATCH /v1/enrollments/{id}/status
pub async fn update_enrollment_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(enrollment_id): Path<i64>,
    ApiJson(request): ApiJson<EnrollmentStatusRequest>,
) -> HandlerResult<Enrollment> {
    caller.require_staff()?;
    let enrollment =
        enrollments::update_status(state.repo(), EnrollmentId::new(enrollment_id), request.status)
            .await?;
    Ok(Json(enrollment))
}

/// GET /v1/students/{id}/enrollments
pub async fn list_student_enrollments(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(student_id): Path<i64>,
) -> HandlerResult<ListResponse<Enrollment>> {
    let student_id = UserId::new(student_id);
    caller.require_self_or_staff(student_id)?;
    let items = enrollments::list_for_student(state.repo(), student_id).await?;
    Ok(Json(items.into()))
}
