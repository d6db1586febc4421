//! Certificate issuing, download and public verification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};

use super::{pdf_response, HandlerResult};
use crate::http::auth::AuthUser;
use crate::http::dto::ListResponse;
use crate::http::error::AppError;
use crate::http::state::AppState;
use crate::models::{Certificate, CertificateId, EnrollmentId, UserId};
use crate::services::certificates::{self, CertificateVerification};

/// POST /v1/enrollments/{id}/certificate
pub async fn generate_certificate(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(enrollment_id): Path<i64>,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    caller.require_staff()?;
    let certificate = certificates::generate(
        state.repo(),
        state.mailer(),
        &state.config,
        EnrollmentId::new(enrollment_id),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

/// GET /v1/certificates/{id}
pub async fn get_certificate(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(certificate_id): Path<i64>,
) -> HandlerResult<Certificate> {
    let certificate =
        certificates::get_certificate(state.repo(), CertificateId::new(certificate_id)).await?;
    caller.require_self_or_staff(certificate.student_id)?;
    Ok(Json(certificate))
}

/// GET /v1/certificates/{id}/pdf
pub async fn certificate_pdf(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(certificate_id): Path<i64>,
) -> Result<Response, AppError> {
    let certificate_id = CertificateId::new(certificate_id);
    let certificate = certificates::get_certificate(state.repo(), certificate_id).await?;
    caller.require_self_or_staff(certificate.student_id)?;
    let (filename, bytes) =
        certificates::render_pdf(state.repo(), &state.config, certificate_id).await?;
    Ok(pdf_response(&filename, bytes))
}

/// GET /v1/certificates/verify/{code}
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> HandlerResult<CertificateVerification> {
    Ok(Json(certificates::verify(state.repo(), &code).await?))
}

/// GET /v1/students/{id}/certificates
pub async fn list_student_certificates(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(student_id): Path<i64>,
) -> HandlerResult<ListResponse<Certificate>> {
    let student_id = UserId::new(student_id);
    caller.require_self_or_staff(student_id)?;
    let items = certificates::list_for_student(state.repo(), student_id).await?;
    Ok(Json(items.into()))
}
