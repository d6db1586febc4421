//! HTTP handlers for the REST API.
//!
//! Each handler authenticates the caller where needed, checks the role
//! guard for the route, and delegates to the service layer.

pub mod accounts;
pub mod bookings;
pub mod certificates;
pub mod courses;
pub mod documents;
pub mod enrollments;
pub mod inquiries;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::HealthResponse;
use super::error::AppError;
use super::state::AppState;
use crate::db::repository::UserRepository;
use crate::render::PDF_CONTENT_TYPE;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repo().health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e.message()),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

/// Serve rendered PDF bytes as a download.
pub(crate) fn pdf_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
