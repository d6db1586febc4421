//! `/v1/inquiries`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::HandlerResult;
use crate::http::auth::AuthUser;
use crate::http::dto::{InquiryListQuery, InquiryStatusRequest, ListResponse};
use crate::http::error::AppError;
use crate::http::extract::{ApiJson, ApiQuery};
use crate::http::state::AppState;
use crate::models::{Inquiry, InquiryId, NewInquiry};
use crate::services::inquiries;

/// POST /v1/inquiries
pub async fn submit_inquiry(
    State(state): State<AppState>,
    ApiJson(inquiry): ApiJson<NewInquiry>,
) -> Result<(StatusCode, Json<Inquiry>), AppError> {
    let inquiry = inquiries::submit_inquiry(state.repo(), inquiry).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// GET /v1/inquiries?status=Pending
pub async fn list_inquiries(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiQuery(query): ApiQuery<InquiryListQuery>,
) -> HandlerResult<ListResponse<Inquiry>> {
    caller.require_admin()?;
    let items = inquiries::list_inquiries(state.repo(), query.status).await?;
    Ok(Json(items.into()))
}

/// GET /v1/inquiries/{id}
pub async fn get_inquiry(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(inquiry_id): Path<i64>,
) -> HandlerResult<Inquiry> {
    caller.require_admin()?;
    let inquiry = inquiries::get_inquiry(state.repo(), InquiryId::new(inquiry_id)).await?;
    Ok(Json(inquiry))
}

/// PATCH /v1/inquiries/{id}/status
pub async fn update_inquiry_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(inquiry_id): Path<i64>,
    ApiJson(request): ApiJson<InquiryStatusRequest>,
) -> HandlerResult<Inquiry> {
    caller.require_admin()?;
    let inquiry = inquiries::update_inquiry_status(
        state.repo(),
        state.mailer(),
        &state.config,
        InquiryId::new(inquiry_id),
        request.status,
        request.response,
    )
    .await?;
    Ok(Json(inquiry))
}
